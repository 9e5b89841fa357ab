// SPDX-License-Identifier: AGPL-3.0-or-later

//! Extinguishing and annotating embers, only for administrators.
use chrono::NaiveDateTime;
use log::info;

use crate::db::errors::SqlStorageError;
use crate::db::traits::EmberStore;
use crate::gate::role::Role;

/// Note appended to the memo of an extinguished ember.
pub const EXTINGUISH_NOTE: &str = "Extinguished by moderation (hidden)";

/// Errors returned by moderation actions.
#[derive(thiserror::Error, Debug)]
pub enum ModerationError {
    /// Visitor is no administrator.
    #[error("This action is not allowed.")]
    Unauthorized,

    /// No ember has this id.
    #[error("Ember #{0} does not exist")]
    NotFound(i64),

    /// Storage failed.
    #[error("Moderation failed: {0}")]
    Store(#[from] SqlStorageError),
}

/// Returns the time-stamped note an extinguished ember gets in its memo.
pub fn extinguish_note(now: NaiveDateTime) -> String {
    format!("[{}] {}", now.format("%Y-%m-%d %H:%M"), EXTINGUISH_NOTE)
}

/// Hides an ember and appends a note to its memo.
///
/// Extinguishing an already hidden ember appends another note.
pub async fn extinguish<S: EmberStore + Sync>(
    store: &S,
    id: i64,
    role: Role,
    now: NaiveDateTime,
) -> Result<(), ModerationError> {
    if !role.is_admin() {
        return Err(ModerationError::Unauthorized);
    }

    if !store.hide_ember(id, &extinguish_note(now), now).await? {
        return Err(ModerationError::NotFound(id));
    }

    info!("Extinguished ember #{}", id);
    Ok(())
}

/// Replaces the memo of an ember with the given text, stored as given.
pub async fn update_memo<S: EmberStore + Sync>(
    store: &S,
    id: i64,
    role: Role,
    memo: &str,
    now: NaiveDateTime,
) -> Result<(), ModerationError> {
    if !role.is_admin() {
        return Err(ModerationError::Unauthorized);
    }

    if !store.update_admin_memo(id, memo, now).await? {
        return Err(ModerationError::NotFound(id));
    }

    info!("Updated memo of ember #{}", id);
    Ok(())
}
