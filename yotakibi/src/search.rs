// SPDX-License-Identifier: AGPL-3.0-or-later

//! Role-dependent search.
//!
//! Guests and ticket holders can only find embers by their exact tinder. Administrators get a
//! small query language instead:
//!
//! - `12-40` or `#12-40`: all embers with ids in this inclusive range
//! - `123`: the ember with this id and every ember whose text contains `123`
//! - anything else: embers whose text or tinder contains the query, case-sensitive
//!
//! Administrator results include extinguished embers. All results are ordered newest first.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::db::errors::SqlStorageError;
use crate::db::traits::EmberStore;
use crate::embers::Ember;
use crate::gate::role::Role;

static ID_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?(\d+)-(\d+)$").expect("valid id range pattern"));

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid number pattern"));

/// How the store should look for embers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Embers with exactly this tinder, hidden ones excluded.
    Passphrase(String),

    /// Embers with ids between both bounds, inclusive.
    IdRange {
        /// Lower bound.
        start: i64,

        /// Upper bound.
        end: i64,
    },

    /// The ember with this id (if the number fits) and all embers containing the digits.
    IdOrContent {
        /// Id to look up, `None` when the digits don't fit into an id.
        id: Option<i64>,

        /// Digits to look for in the text.
        digits: String,
    },

    /// Embers whose text or tinder contains this text.
    Text(String),
}

/// Picks the search strategy for a query. Returns `None` for blank queries.
pub fn select(role: Role, query: &str) -> Option<SearchStrategy> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    if !role.is_admin() {
        return Some(SearchStrategy::Passphrase(query.to_owned()));
    }

    if let Some(captures) = ID_RANGE.captures(query) {
        let start = captures[1].parse::<i64>();
        let end = captures[2].parse::<i64>();

        // Ranges with unrepresentable bounds are searched for as text
        if let (Ok(start), Ok(end)) = (start, end) {
            return Some(SearchStrategy::IdRange {
                start: start.min(end),
                end: start.max(end),
            });
        }
    }

    if NUMBER.is_match(query) {
        return Some(SearchStrategy::IdOrContent {
            id: query.parse::<i64>().ok(),
            digits: query.to_owned(),
        });
    }

    Some(SearchStrategy::Text(query.to_owned()))
}

/// Searches the store with the strategy the role and query call for.
///
/// Returns `None` for blank queries, callers redirect to the listing then.
pub async fn search<S: EmberStore + Sync>(
    store: &S,
    role: Role,
    query: &str,
) -> Result<Option<Vec<Ember>>, SqlStorageError> {
    let strategy = match select(role, query) {
        Some(strategy) => strategy,
        None => return Ok(None),
    };

    let embers = store.search_embers(&strategy).await?;
    Ok(Some(embers))
}
