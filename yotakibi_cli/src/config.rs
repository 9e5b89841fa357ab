// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{crate_version, Parser};
use colored::Colorize;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::Serialize;
use yotakibi::{ConfigFile, Configuration};

use crate::utils::absolute_path;

const CONFIG_FILE_NAME: &str = "config.toml";

type ConfigFilePath = Option<PathBuf>;

type SeedFilePath = Option<PathBuf>;

/// Get configuration from 1. .toml file, 2. environment variables and 3. command line arguments
/// (in that order, meaning that later configuration sources take precedence over the earlier
/// ones).
///
/// Environment variables are read without prefix, so the variables known from deployments
/// (`SECRET_KEY`, `ADMIN_KEY`, `AI_BOT_SECRET`, ..) can be used as they are.
///
/// Returns a partly unchecked configuration object which results from all of these sources. It
/// still needs to be converted for yotakibi as it might still contain invalid values.
pub fn load_config() -> Result<(ConfigFilePath, ConfigFile, SeedFilePath)> {
    // Parse command line arguments first to get optional config file path
    let cli = Cli::parse();
    let seed = cli.seed.clone();

    // Determine if a config file path was provided or if we should look for it in common locations
    let config_file_path: ConfigFilePath = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("Config file '{}' does not exist", path.display());
            }

            Some(path.clone())
        }
        None => try_determine_config_file_path(),
    };

    let config = figment(config_file_path.as_ref(), cli).extract()?;

    Ok((config_file_path, config, seed))
}

fn figment(config_file_path: Option<&PathBuf>, cli: Cli) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(ConfigFile::default()));
    if let Some(path) = config_file_path {
        figment = figment.merge(Toml::file(path));
    }

    figment.merge(Env::raw()).merge(Serialized::defaults(cli))
}

/// Configuration derived from command line arguments.
///
/// All arguments are optional and don't get serialized to Figment when they're None. This is to
/// assure that default values do not overwrite all previous settings, especially when they haven't
/// been set.
///
/// Secrets can only be set in the config file or through environment variables, they would
/// otherwise end up in the history of the shell.
#[derive(Parser, Serialize, Debug)]
#[command(
    name = "yotakibi",
    about = "Anonymous diary board burning only at night",
    long_about = None,
    version
)]
struct Cli {
    /// Path to an optional "config.toml" file for further configuration.
    ///
    /// When not set the program will try to find a `config.toml` file in the same folder the
    /// program is executed in and otherwise in the regarding operation systems XDG config
    /// directory ("$HOME/.config/yotakibi/config.toml" on Linux).
    #[arg(short = 'c', long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<PathBuf>,

    /// URL / connection string to PostgreSQL or SQLite database. Defaults to a SQLite database
    /// file "yotakibi.db" in the current folder.
    #[arg(short = 'd', long, value_name = "CONNECTION_STRING")]
    #[serde(skip_serializing_if = "Option::is_none")]
    database_url: Option<String>,

    /// HTTP port serving the board. Defaults to 2020.
    #[arg(short = 'p', long, value_name = "PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    http_port: Option<u16>,

    /// Path to a folder with static assets served under "/static".
    #[arg(short = 'f', long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    static_dir: Option<PathBuf>,

    /// Fixed offset from UTC in hours for the opening hours, for example 9 for Japan. Uses the
    /// timezone of the host by default.
    #[arg(short = 'u', long, value_name = "HOURS", allow_hyphen_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    utc_offset_hours: Option<i32>,

    /// Which embers pass the content safety filter: "human", "generated" or "both". Defaults to
    /// "both".
    #[arg(short = 's', long, value_name = "SCOPE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    safety_scope: Option<String>,

    /// Guests need to write an ember before they can read the board. Disabled by default.
    #[arg(
        short = 'r',
        long,
        value_name = "BOOL",
        default_missing_value = "true",
        num_args = 0..=1,
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    require_post_before_reading: Option<bool>,

    /// Path to a JSON file with embers to throw into the fire on start.
    ///
    /// Every ember claims to be written on a random evening of the last week. Seeding the same
    /// file twice inserts everything twice.
    #[arg(long, value_name = "PATH")]
    #[serde(skip)]
    seed: Option<PathBuf>,

    /// Set log verbosity. Use this for learning more about how the board behaves or for
    /// debugging.
    ///
    /// Possible log levels are: ERROR, WARN, INFO, DEBUG, TRACE. They are scoped to "yotakibi" by
    /// default.
    ///
    /// If you want to adjust the scope for deeper inspection use a filter value, for example
    /// "=TRACE" for logging _everything_ or "yotakibi=INFO,sqlx=DEBUG" etc.
    #[arg(short = 'l', long, value_name = "LEVEL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
}

fn try_determine_config_file_path() -> Option<PathBuf> {
    // Find config file in current folder
    let mut current_dir = std::env::current_dir().ok()?;
    current_dir.push(CONFIG_FILE_NAME);

    // Find config file in XDG config folder
    let mut candidates = vec![current_dir];
    if let Some(project_dirs) = ProjectDirs::from("", "", "yotakibi") {
        let mut xdg_config_dir = project_dirs.config_dir().to_path_buf();
        xdg_config_dir.push(CONFIG_FILE_NAME);
        candidates.push(xdg_config_dir);
    }

    candidates.into_iter().find(|path| path.exists())
}

fn enabled(value: bool) -> &'static str {
    if value {
        "enabled"
    } else {
        "disabled"
    }
}

fn configured(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "set",
        None => "not set",
    }
}

pub fn print_config(config_file_path: ConfigFilePath, config: &Configuration) -> String {
    println!(
        r"
                 (
                  )  )
              (  (  (
               )  ) )  )
             (  (___)  (
            .-'`     `'-.
           /  .-.   .-.  \
          ~~~~~~~~~~~~~~~~~~
    "
    );

    println!("{} v{}\n", "yotakibi".underline(), crate_version!());

    match config_file_path {
        Some(path) => {
            println!(
                "Loading config file from {}",
                absolute_path(path).display().to_string().blue()
            );
        }
        None => {
            println!("No config file provided");
        }
    }

    println!();
    println!("{}\n", "Configuration".underline());

    let database_url = if config.database_url == "sqlite::memory:"
        || config.database_url.contains("mode=memory")
    {
        "memory (data is not persisted)".into()
    } else if config.database_url.contains("sqlite:") {
        format!("SQLite: {}", config.database_url)
    } else {
        "PostgreSQL".into()
    };

    let timezone = match config.utc_offset_hours {
        Some(hours) => format!("UTC{:+}", hours),
        None => "host timezone".into(),
    };

    let static_dir = match &config.static_dir {
        Some(path) => absolute_path(path).display().to_string(),
        None => "none".into(),
    };

    let secrets = if config.uses_dev_secrets() {
        "development defaults (do not go public like this)".red().to_string()
    } else {
        "custom".blue().to_string()
    };

    format!(
        r"Database URL: {}
HTTP port: {}
Opening hours: {}
Static files: {}
Safety filter: {:?}
Post before reading: {}
Session secrets: {}
Admin key: {}
Ticket key: {}
Generated embers: {}

The fire is ready!
",
        database_url.blue(),
        config.http_port.to_string().blue(),
        timezone.blue(),
        static_dir.blue(),
        config.safety_scope,
        enabled(config.require_post_before_reading).blue(),
        secrets,
        configured(&config.admin_key).blue(),
        configured(&config.ticket_key).blue(),
        enabled(config.gemini_api_key.is_some() && config.bot_secret.is_some()).blue(),
    )
}
