// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-identity limit on how many embers can be written within an hour.
//!
//! The limit counts embers by their real write time, backdating does not free any capacity.
//! Checking and inserting is serialised per identity through [`IdentityLocks`] within one process.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDateTime};
use log::debug;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db::errors::SqlStorageError;
use crate::db::traits::EmberStore;
use crate::gate::role::Role;
use crate::identity::IdentityToken;

/// Maximum number of embers per identity within the window.
pub const MAX_SUBMISSIONS_PER_WINDOW: u64 = 5;

/// Length of the trailing window in minutes.
pub const WINDOW_MINUTES: i64 = 60;

/// Message shown when the limit is reached.
pub const RATE_LIMIT_MESSAGE: &str =
    "The fire is burning high. Please take a break and write again after a while.";

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Writing is allowed.
    Allow,

    /// Limit is reached.
    Deny,
}

/// Checks whether an identity may write another ember at `now`.
///
/// Administrators are never limited. Writes without identity can not be attributed and pass.
pub async fn check<S: EmberStore + Sync>(
    store: &S,
    identity_token: Option<&IdentityToken>,
    now: NaiveDateTime,
    role: Role,
) -> Result<RateLimitDecision, SqlStorageError> {
    if role.is_admin() {
        return Ok(RateLimitDecision::Allow);
    }

    let identity_token = match identity_token {
        Some(token) => token,
        None => return Ok(RateLimitDecision::Allow),
    };

    let since = now - Duration::minutes(WINDOW_MINUTES);
    let count = store.count_submissions_since(identity_token, since).await?;

    if count >= MAX_SUBMISSIONS_PER_WINDOW {
        debug!("Rate limit reached for identity {}", identity_token);
        Ok(RateLimitDecision::Deny)
    } else {
        Ok(RateLimitDecision::Allow)
    }
}

type LockTable = HashMap<IdentityToken, Arc<AsyncMutex<()>>>;

/// Table of locks keyed by identity, entries get removed when nobody holds or waits for them.
#[derive(Debug, Clone, Default)]
pub struct IdentityLocks {
    table: Arc<Mutex<LockTable>>,
}

impl IdentityLocks {
    /// Returns an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds the lock of this identity and takes it.
    pub async fn acquire(&self, identity_token: &IdentityToken) -> IdentityGuard {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(|err| err.into_inner());
            table
                .entry(identity_token.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        IdentityGuard {
            guard: Some(lock.lock_owned().await),
            identity_token: identity_token.clone(),
            table: self.table.clone(),
        }
    }

    /// Number of identities currently locked or waited for.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }

    /// Returns true when no identity is locked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held lock of one identity, released on drop.
#[derive(Debug)]
pub struct IdentityGuard {
    guard: Option<OwnedMutexGuard<()>>,
    identity_token: IdentityToken,
    table: Arc<Mutex<LockTable>>,
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(|err| err.into_inner());

        // Release first, then drop the entry if only the table still refers to it
        self.guard.take();
        let unused = table
            .get(&self.identity_token)
            .map_or(false, |lock| Arc::strong_count(lock) == 1);
        if unused {
            table.remove(&self.identity_token);
        }
    }
}
