// SPDX-License-Identifier: AGPL-3.0-or-later

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::db::errors::SqlStorageError;
use crate::db::types::{ListScope, NewEmber, Page, PageRequest};
use crate::embers::Ember;
use crate::identity::IdentityToken;
use crate::search::SearchStrategy;

/// Storage of embers. Embers are inserted once and afterwards only hidden or annotated, there is
/// no way to delete them.
#[async_trait]
pub trait EmberStore {
    /// Inserts a new ember and returns it with its assigned id.
    async fn insert_ember(&self, ember: &NewEmber) -> Result<Ember, SqlStorageError>;

    /// Returns the ember with the given id, hidden or not.
    async fn get_ember(&self, id: i64) -> Result<Option<Ember>, SqlStorageError>;

    /// Returns one page of the listing, newest first.
    async fn list_embers(
        &self,
        scope: ListScope,
        page: PageRequest,
    ) -> Result<Page<Ember>, SqlStorageError>;

    /// Returns all embers matching a search strategy, newest first.
    async fn search_embers(&self, strategy: &SearchStrategy)
        -> Result<Vec<Ember>, SqlStorageError>;

    /// Counts embers written by an identity since the given time.
    async fn count_submissions_since(
        &self,
        identity_token: &IdentityToken,
        since: NaiveDateTime,
    ) -> Result<u64, SqlStorageError>;

    /// Hides an ember and appends a line to its memo in one statement. Returns false when no
    /// ember has this id.
    async fn hide_ember(
        &self,
        id: i64,
        note: &str,
        updated_at: NaiveDateTime,
    ) -> Result<bool, SqlStorageError>;

    /// Replaces the memo of an ember. Returns false when no ember has this id.
    async fn update_admin_memo(
        &self,
        id: i64,
        admin_memo: &str,
        updated_at: NaiveDateTime,
    ) -> Result<bool, SqlStorageError>;
}
