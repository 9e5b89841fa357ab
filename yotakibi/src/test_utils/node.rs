// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};

use crate::clock::{Clock, FixedClock};
use crate::context::Context;
use crate::db::traits::EmberStore;
use crate::db::types::NewEmber;
use crate::db::utils::truncate_to_micros;
use crate::db::SqlStore;
use crate::embers::{Ember, Visibility};
use crate::safety::SafetyPolicy;
use crate::Configuration;

/// Hour the clock of test nodes stands still at, the fire is burning then.
pub const TEST_HOUR: u32 = 20;

/// Test node which contains a context with an [`SqlStore`].
pub struct TestNode {
    pub context: Context,
}

/// Returns a context on top of an existing store with the given configuration and a clock
/// standing still at `hour`.
pub fn test_context(store: SqlStore, config: Configuration, hour: u32) -> Context {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::at_hour(hour));
    let safety = SafetyPolicy::standard().expect("Standard safety policy compiles");

    Context::new(store, config, clock, safety, None)
}

fn now() -> NaiveDateTime {
    truncate_to_micros(Utc::now().naive_utc())
}

/// Returns an unattributed, private ember written right now.
pub fn new_ember(content: &str, passphrase: &str) -> NewEmber {
    let now = now();

    NewEmber {
        external_id: uuid::Uuid::new_v4().to_string(),
        content: content.to_owned(),
        passphrase: passphrase.to_owned(),
        visibility: Visibility::default(),
        identity_token: None,
        client_signature: None,
        created_at: now,
        submitted_at: now,
    }
}

/// Inserts an ember bypassing all gates and returns it.
pub async fn insert_ember(store: &SqlStore, content: &str, passphrase: &str) -> Ember {
    store
        .insert_ember(&new_ember(content, passphrase))
        .await
        .expect("Insert ember into test database")
}

/// Returns an ember which was never stored.
pub fn ember_fixture(id: i64, content: &str, passphrase: &str) -> Ember {
    let ember = new_ember(content, passphrase);

    Ember {
        id,
        external_id: ember.external_id,
        content: ember.content,
        passphrase: ember.passphrase,
        visibility: ember.visibility,
        is_hidden: false,
        admin_memo: None,
        identity_token: None,
        client_signature: None,
        created_at: ember.created_at,
        submitted_at: ember.submitted_at,
        updated_at: ember.submitted_at,
    }
}
