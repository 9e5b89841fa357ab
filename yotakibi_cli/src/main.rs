// SPDX-License-Identifier: AGPL-3.0-or-later

mod config;
mod utils;

use std::convert::TryInto;
use std::str::FromStr;

use anyhow::Context;
use log::LevelFilter;
use yotakibi::{Configuration, Node};

use crate::config::{load_config, print_config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from command line arguments, environment variables and .toml file
    let (config_file_path, config, seed) = load_config().context("Could not load configuration")?;

    // Set log verbosity based on config. By default scope it always to the "yotakibi" module.
    let mut builder = env_logger::Builder::new();
    let builder = match LevelFilter::from_str(&config.log_level) {
        Ok(log_level) => builder.filter(Some("yotakibi"), log_level),
        Err(_) => builder.parse_filters(&config.log_level),
    };
    builder.init();

    // Convert to yotakibi configuration format and check for invalid inputs
    let node_config: Configuration = config
        .try_into()
        .context("Could not load configuration")?;

    // Show configuration info to the user
    println!("{}", print_config(config_file_path, &node_config));

    // Start the board in async runtime
    let node = Node::start(node_config)
        .await
        .context("Could not start the fire")?;

    if let Some(path) = seed {
        let count = node
            .seed(&path)
            .await
            .with_context(|| format!("Could not seed embers from '{}'", path.display()))?;
        println!("Lit {} embers from the seed file", count);
    }

    // Run this until [CTRL] + [C] got pressed or something went wrong
    tokio::select! {
        _ = tokio::signal::ctrl_c() => (),
        _ = node.on_exit() => (),
    }

    // Wait until all tasks are gracefully shut down and exit
    node.shutdown().await;

    Ok(())
}
