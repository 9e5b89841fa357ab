// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persistent storage of embers supporting both PostgreSQL and SQLite databases.
//!
//! The main interface is [`SqlStore`] which implements the [`EmberStore`](traits::EmberStore)
//! trait the gatekeeping engine depends on.
use anyhow::{Error, Result};
use sqlx::any::{Any, AnyPool, AnyPoolOptions};
use sqlx::migrate;
use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::Executor;

pub mod errors;
pub mod models;
pub mod stores;
pub mod traits;
pub mod types;
pub mod utils;

static SQLITE_MIGRATIONS: Migrator = migrate!("./migrations/sqlite");

static POSTGRES_MIGRATIONS: Migrator = migrate!("./migrations/postgres");

/// SQL based persistent storage that implements `EmberStore`.
#[derive(Clone, Debug)]
pub struct SqlStore {
    pub(crate) pool: Pool,
}

impl SqlStore {
    /// Create a new `SqlStore` using the provided db `Pool`.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// Re-export of generic connection pool type.
pub type Pool = AnyPool;

/// Returns true when the database URL points at a SQLite database.
pub fn is_sqlite(url: &str) -> bool {
    url.starts_with("sqlite:")
}

/// Create database when not existing.
pub async fn create_database(url: &str) -> Result<()> {
    if !Any::database_exists(url).await? {
        Any::create_database(url).await?;
    }

    Ok(())
}

/// Create a database agnostic connection pool.
///
/// SQLite connections get `LIKE` switched to case-sensitive matching, which is what PostgreSQL
/// does anyhow.
pub async fn connection_pool(url: &str, max_connections: u32) -> Result<Pool, Error> {
    let sqlite = is_sqlite(url);

    let pool: Pool = AnyPoolOptions::new()
        .max_connections(max_connections)
        .test_before_acquire(true)
        .after_connect(move |connection, _meta| {
            Box::pin(async move {
                if sqlite {
                    connection
                        .execute("PRAGMA case_sensitive_like = ON")
                        .await?;
                }
                Ok(())
            })
        })
        .connect(url)
        .await?;

    Ok(pool)
}

/// Run any pending database migrations for the backend behind `url` from inside the
/// application.
pub async fn run_pending_migrations(pool: &Pool, url: &str) -> Result<()> {
    if is_sqlite(url) {
        SQLITE_MIGRATIONS.run(pool).await?;
    } else {
        POSTGRES_MIGRATIONS.run(pool).await?;
    }

    Ok(())
}
