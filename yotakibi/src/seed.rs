// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fills an empty board with embers from a JSON file, so the fire is not cold on the first night.
//!
//! The file holds an array of objects:
//!
//! ```json
//! [{ "content": "...", "passphrase": "...", "is_timeline_public": true }]
//! ```
//!
//! Every seeded ember claims to be written on a random evening of the last week. Seeds pass the
//! same length checks and content safety filter as written embers, failing ones are skipped.
use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use log::{info, warn};
use rand::Rng;
use serde::Deserialize;
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::errors::SqlStorageError;
use crate::db::traits::EmberStore;
use crate::db::types::NewEmber;
use crate::embers::submit::{validate, ValidationError};
use crate::embers::Visibility;
use crate::gate::hours::OPENING_HOUR;
use crate::safety::{SafetyPolicy, SafetyRejection};

/// Latest minute after opening a seeded ember can claim.
const SPREAD_MINUTES: i64 = 360;

/// Ember as written in the seed file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Seed {
    /// Text of the ember.
    pub content: String,

    /// Tinder of the ember.
    #[serde(alias = "aikotoba")]
    pub passphrase: String,

    /// Ember shows up in the public listing.
    #[serde(default, alias = "is_public")]
    pub is_timeline_public: bool,

    /// Tinder is shown in the public listing.
    #[serde(default, alias = "show_aikotoba")]
    pub is_passphrase_public: bool,
}

/// Errors returned when seeding the store.
#[derive(thiserror::Error, Debug)]
pub enum SeedError {
    /// Seed file could not be read.
    #[error("Could not read seed file: {0}")]
    Read(#[from] std::io::Error),

    /// Seed file is no array of embers.
    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] SqlStorageError),
}

/// Reasons for skipping a single seed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedRejection {
    /// Ember or tinder is missing or has the wrong length.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Content safety filter rejected ember or tinder.
    #[error(transparent)]
    Unsafe(#[from] SafetyRejection),
}

/// Checks a seed like an ember written by a visitor.
pub fn check_seed(seed: &Seed, safety: &SafetyPolicy) -> Result<(), SeedRejection> {
    let passphrase = seed.passphrase.trim();
    validate(&seed.content, passphrase)?;
    safety.check(passphrase, true, false)?;
    safety.check(&seed.content, false, false)?;
    Ok(())
}

/// Returns a random time between 19:00 and 01:00 of one of the seven days before `now`.
pub fn random_evening<R: Rng>(now: NaiveDateTime, rng: &mut R) -> NaiveDateTime {
    let days_ago = rng.gen_range(1..=7);
    let minutes = rng.gen_range(0..=SPREAD_MINUTES);

    let evening = (now.date() - Duration::days(days_ago))
        .and_hms_opt(OPENING_HOUR, 0, 0)
        .unwrap_or_default();
    evening + Duration::minutes(minutes)
}

/// Parses seeds from JSON text.
pub fn parse_seeds(json: &str) -> Result<Vec<Seed>, SeedError> {
    Ok(serde_json::from_str(json)?)
}

/// Inserts all acceptable embers of a seed file and returns how many were inserted.
///
/// Seeds are neither attributed to an identity nor rate limited.
pub async fn load_seeds<S: EmberStore + Sync>(
    store: &S,
    safety: &SafetyPolicy,
    path: &Path,
    clock: &dyn Clock,
) -> Result<usize, SeedError> {
    let seeds = parse_seeds(&tokio::fs::read_to_string(path).await?)?;
    let now = clock.now();

    let embers: Vec<NewEmber> = {
        let mut rng = rand::thread_rng();
        seeds
            .into_iter()
            .enumerate()
            .filter_map(|(index, seed)| match check_seed(&seed, safety) {
                Ok(()) => Some(seed),
                Err(rejection) => {
                    warn!("Skip seed #{} in {}: {}", index, path.display(), rejection);
                    None
                }
            })
            .map(|seed| NewEmber {
                external_id: Uuid::new_v4().to_string(),
                passphrase: seed.passphrase.trim().to_owned(),
                content: seed.content,
                visibility: Visibility {
                    timeline_public: seed.is_timeline_public,
                    passphrase_public: seed.is_passphrase_public,
                    ..Visibility::default()
                }
                .normalized(),
                identity_token: None,
                client_signature: None,
                created_at: random_evening(now, &mut rng),
                submitted_at: now,
            })
            .collect()
    };

    for ember in &embers {
        store.insert_ember(ember).await?;
    }

    info!("Lit {} embers from {}", embers.len(), path.display());
    Ok(embers.len())
}
