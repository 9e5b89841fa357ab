// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::migrate::MigrateDatabase;
use sqlx::Any;

use crate::db::{connection_pool, create_database, run_pending_migrations, Pool};

/// Create test database.
pub async fn initialize_db(url: &str) -> Pool {
    // Reset database first
    drop_database(url).await;
    create_database(url).await.unwrap();

    // Create connection pool and run all migrations. A single connection keeps in-memory SQLite
    // databases alive and visible to every query of the test
    let pool = connection_pool(url, 1).await.unwrap();
    if run_pending_migrations(&pool, url).await.is_err() {
        pool.close().await;
    }

    pool
}

/// Delete test database.
///
/// In-memory databases always count as existing and vanish with their last connection, they are
/// left alone.
pub async fn drop_database(url: &str) {
    if url.contains("mode=memory") {
        return;
    }

    if Any::database_exists(url).await.unwrap() {
        Any::drop_database(url).await.unwrap();
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestConfiguration;

    use super::initialize_db;

    #[tokio::test]
    async fn migrated_schema_visible_to_every_query() {
        let url = TestConfiguration::new().database_url;
        let pool = initialize_db(&url).await;

        let pool_ref = &pool;
        let count =
            move || sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM embers").fetch_one(pool_ref);
        let (first, second, third) = tokio::join!(count(), count(), count());

        for result in [first, second, third] {
            assert_eq!(result.unwrap(), 0);
        }

        pool.close().await;
    }
}
