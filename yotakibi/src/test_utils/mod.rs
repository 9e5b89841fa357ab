// SPDX-License-Identifier: AGPL-3.0-or-later

mod client;
mod config;
mod db;
mod node;
mod runner;

pub use client::{http_test_client, TestClient};
pub use config::TestConfiguration;
pub use db::{drop_database, initialize_db};
pub use node::{ember_fixture, insert_ember, new_ember, test_context, TestNode, TEST_HOUR};
pub use runner::test_runner;
