// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Configuration;
use crate::context::Context;
use crate::db::SqlStore;
use crate::db::{connection_pool, create_database, run_pending_migrations, Pool};
use crate::generator::{EmberGenerator, GeminiGenerator};
use crate::http::http_service;
use crate::manager::ServiceManager;
use crate::safety::SafetyPolicy;
use crate::seed::load_seeds;

/// Makes sure database is created and migrated before returning connection pool.
async fn initialize_db(config: &Configuration) -> Result<Pool> {
    // Create database when not existing
    create_database(&config.database_url).await?;

    // Create connection pool
    let pool = connection_pool(&config.database_url, config.database_max_connections).await?;

    // Run pending migrations
    run_pending_migrations(&pool, &config.database_url).await?;

    Ok(pool)
}

/// Returns the clock the opening hours follow.
fn clock(config: &Configuration) -> Result<Arc<dyn Clock>> {
    let clock = match config.utc_offset_hours {
        Some(hours) => SystemClock::with_offset_hours(hours)
            .ok_or_else(|| anyhow!("UTC offset of {} hours is out of range", hours))?,
        None => SystemClock::local(),
    };

    Ok(Arc::new(clock))
}

/// Returns the generator for embers, when an API key was configured.
fn generator(config: &Configuration) -> Result<Option<Arc<dyn EmberGenerator>>> {
    let api_key = match config.gemini_api_key.as_deref() {
        Some(api_key) if !api_key.is_empty() => api_key,
        _ => {
            info!("No Gemini API key configured, generated embers are disabled");
            return Ok(None);
        }
    };

    let generator = GeminiGenerator::new(api_key, &config.gemini_model)?;
    Ok(Some(Arc::new(generator)))
}

/// Main runtime managing the board process.
#[allow(missing_debug_implementations)]
pub struct Node {
    pool: Pool,
    context: Context,
    manager: ServiceManager<Context>,
}

impl Node {
    /// Start the board with your configuration. This method can be used to run the board within
    /// other applications.
    pub async fn start(config: Configuration) -> Result<Self> {
        if config.uses_dev_secrets() {
            warn!("Session key or address salt still use their development defaults, set SECRET_KEY and IP_SALT before going public");
        }

        let clock = clock(&config)?;
        let generator = generator(&config)?;
        let safety = SafetyPolicy::standard()?;

        // Initialize database and get connection pool
        let pool = initialize_db(&config).await?;
        let store = SqlStore::new(pool.clone());

        // Create service manager with shared data between services
        let context = Context::new(store, config, clock, safety, generator);
        let mut manager = ServiceManager::<Context>::new(context.clone());

        // Start HTTP server
        manager.add("http", http_service);

        Ok(Self {
            pool,
            context,
            manager,
        })
    }

    /// Throws the acceptable embers of a seed file into the fire and returns how many there were.
    pub async fn seed(&self, path: &Path) -> Result<usize> {
        let count = load_seeds(
            &self.context.store,
            &self.context.safety,
            path,
            self.context.clock.as_ref(),
        )
        .await?;
        Ok(count)
    }

    /// This future resolves when at least one system service stopped.
    ///
    /// It can be used to exit the application as a stopped service usually means that something
    /// went wrong.
    pub async fn on_exit(&self) {
        self.manager.on_exit().await;
    }

    /// Close all running concurrent tasks and wait until they are fully shut down.
    pub async fn shutdown(self) {
        // Wait until all tasks are shut down
        self.manager.shutdown().await;

        // Close connection pool
        self.pool.close().await;
    }
}
