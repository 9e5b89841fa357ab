// SPDX-License-Identifier: AGPL-3.0-or-later

use std::future::Future;
use std::panic;

use tokio::runtime::Builder;

use crate::db::SqlStore;
use crate::test_utils::node::TEST_HOUR;
use crate::test_utils::{initialize_db, test_context, TestConfiguration, TestNode};
use crate::Configuration;

/// Async test body receiving a fresh [`TestNode`].
#[async_trait::async_trait]
pub trait AsyncTestFn {
    async fn call(self, node: TestNode);
}

#[async_trait::async_trait]
impl<FN, F> AsyncTestFn for FN
where
    FN: FnOnce(TestNode) -> F + Sync + Send,
    F: Future<Output = ()> + Send,
{
    async fn call(self, node: TestNode) {
        self(node).await
    }
}

/// Runs an async test against its own empty, migrated database.
///
/// The connection pool gets closed after the test, also when it panicked. Panics are re-raised
/// afterwards so the test still fails. The clock of the node stands still at 20:00, while the
/// fire is burning.
pub fn test_runner<F: AsyncTestFn + Send + Sync + 'static>(test: F) {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .thread_name("yotakibi_test")
        .build()
        .expect("Could not build tokio runtime for test");

    runtime.block_on(async {
        let database_url = TestConfiguration::new().database_url;
        let store = SqlStore::new(initialize_db(&database_url).await);
        let pool = store.pool.clone();

        let config = Configuration {
            database_url,
            ..Configuration::default()
        };
        let node = TestNode {
            context: test_context(store, config, TEST_HOUR),
        };

        // A panic inside the spawned task surfaces as a join error instead of unwinding here
        let result = tokio::task::spawn(test.call(node)).await;

        pool.close().await;

        if let Err(err) = result {
            panic::resume_unwind(err.into_panic());
        }
    });
}
