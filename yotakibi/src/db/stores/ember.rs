// SPDX-License-Identifier: AGPL-3.0-or-later

use std::convert::TryFrom;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{query, query_as, query_scalar};

use crate::db::errors::SqlStorageError;
use crate::db::models::EmberRow;
use crate::db::traits::EmberStore;
use crate::db::types::{ListScope, NewEmber, Page, PageRequest};
use crate::db::utils::{contains_pattern, encode_timestamp, truncate_to_micros};
use crate::db::SqlStore;
use crate::embers::Ember;
use crate::identity::IdentityToken;
use crate::search::SearchStrategy;

const SELECT_EMBERS: &str = "
    SELECT
        id,
        external_id,
        content,
        passphrase,
        is_timeline_public,
        is_passphrase_public,
        allow_external_share,
        allow_external_share_of_passphrase,
        is_hidden,
        admin_memo,
        identity_token,
        client_signature,
        created_at,
        submitted_at,
        updated_at
    FROM
        embers
";

const NEWEST_FIRST: &str = "
    ORDER BY
        created_at DESC,
        id DESC
";

/// Separates lines appended to a memo.
const MEMO_SEPARATOR: &str = "\n";

fn into_embers(rows: Vec<EmberRow>) -> Result<Vec<Ember>, SqlStorageError> {
    rows.into_iter().map(Ember::try_from).collect()
}

#[async_trait]
impl EmberStore for SqlStore {
    async fn insert_ember(&self, ember: &NewEmber) -> Result<Ember, SqlStorageError> {
        let submitted_at = encode_timestamp(&ember.submitted_at);

        let id: i64 = query_scalar(
            "
            INSERT INTO
                embers (
                    external_id,
                    content,
                    passphrase,
                    is_timeline_public,
                    is_passphrase_public,
                    allow_external_share,
                    allow_external_share_of_passphrase,
                    is_hidden,
                    identity_token,
                    client_signature,
                    created_at,
                    submitted_at,
                    updated_at
                )
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, FALSE, $8, $9, $10, $11, $12)
            RETURNING
                id
            ",
        )
        .bind(ember.external_id.as_str())
        .bind(ember.content.as_str())
        .bind(ember.passphrase.as_str())
        .bind(ember.visibility.timeline_public)
        .bind(ember.visibility.passphrase_public)
        .bind(ember.visibility.external_share)
        .bind(ember.visibility.external_share_passphrase)
        .bind(ember.identity_token.as_ref().map(|token| token.to_string()))
        .bind(ember.client_signature.clone())
        .bind(encode_timestamp(&ember.created_at))
        .bind(submitted_at.as_str())
        .bind(submitted_at.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| SqlStorageError::Transaction(err.to_string()))?;

        // Return timestamps with the precision they were stored with
        Ok(Ember {
            id,
            external_id: ember.external_id.clone(),
            content: ember.content.clone(),
            passphrase: ember.passphrase.clone(),
            visibility: ember.visibility,
            is_hidden: false,
            admin_memo: None,
            identity_token: ember.identity_token.clone(),
            client_signature: ember.client_signature.clone(),
            created_at: truncate_to_micros(ember.created_at),
            submitted_at: truncate_to_micros(ember.submitted_at),
            updated_at: truncate_to_micros(ember.submitted_at),
        })
    }

    async fn get_ember(&self, id: i64) -> Result<Option<Ember>, SqlStorageError> {
        let sql = format!("{SELECT_EMBERS} WHERE id = $1");

        let row = query_as::<_, EmberRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| SqlStorageError::Transaction(err.to_string()))?;

        row.map(Ember::try_from).transpose()
    }

    async fn list_embers(
        &self,
        scope: ListScope,
        page: PageRequest,
    ) -> Result<Page<Ember>, SqlStorageError> {
        let filter = match scope {
            ListScope::Public => "WHERE is_hidden = FALSE AND is_timeline_public = TRUE",
            ListScope::Everything => "",
        };

        let total: i64 = query_scalar(&format!("SELECT COUNT(*) FROM embers {filter}"))
            .fetch_one(&self.pool)
            .await
            .map_err(|err| SqlStorageError::Transaction(err.to_string()))?;

        let sql = format!("{SELECT_EMBERS} {filter} {NEWEST_FIRST} LIMIT $1 OFFSET $2");
        let rows = query_as::<_, EmberRow>(&sql)
            .bind(i64::from(page.per_page()))
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|err| SqlStorageError::Transaction(err.to_string()))?;

        Ok(Page {
            items: into_embers(rows)?,
            page: page.page(),
            per_page: page.per_page(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn search_embers(
        &self,
        strategy: &SearchStrategy,
    ) -> Result<Vec<Ember>, SqlStorageError> {
        let rows = match strategy {
            SearchStrategy::Passphrase(passphrase) => {
                let sql = format!(
                    "{SELECT_EMBERS} WHERE passphrase = $1 AND is_hidden = FALSE {NEWEST_FIRST}"
                );
                query_as::<_, EmberRow>(&sql)
                    .bind(passphrase.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            SearchStrategy::IdRange { start, end } => {
                let sql = format!("{SELECT_EMBERS} WHERE id BETWEEN $1 AND $2 {NEWEST_FIRST}");
                query_as::<_, EmberRow>(&sql)
                    .bind(*start)
                    .bind(*end)
                    .fetch_all(&self.pool)
                    .await
            }
            SearchStrategy::IdOrContent {
                id: Some(id),
                digits,
            } => {
                let sql = format!(
                    "{SELECT_EMBERS} WHERE id = $1 OR content LIKE $2 ESCAPE '\\' {NEWEST_FIRST}"
                );
                query_as::<_, EmberRow>(&sql)
                    .bind(*id)
                    .bind(contains_pattern(digits))
                    .fetch_all(&self.pool)
                    .await
            }
            SearchStrategy::IdOrContent { id: None, digits } => {
                let sql =
                    format!("{SELECT_EMBERS} WHERE content LIKE $1 ESCAPE '\\' {NEWEST_FIRST}");
                query_as::<_, EmberRow>(&sql)
                    .bind(contains_pattern(digits))
                    .fetch_all(&self.pool)
                    .await
            }
            SearchStrategy::Text(text) => {
                let sql = format!(
                    "{SELECT_EMBERS}
                    WHERE
                        content LIKE $1 ESCAPE '\\'
                        OR passphrase LIKE $2 ESCAPE '\\'
                    {NEWEST_FIRST}"
                );
                let pattern = contains_pattern(text);
                query_as::<_, EmberRow>(&sql)
                    .bind(pattern.as_str())
                    .bind(pattern.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|err| SqlStorageError::Transaction(err.to_string()))?;

        into_embers(rows)
    }

    async fn count_submissions_since(
        &self,
        identity_token: &IdentityToken,
        since: NaiveDateTime,
    ) -> Result<u64, SqlStorageError> {
        let count: i64 = query_scalar(
            "
            SELECT
                COUNT(*)
            FROM
                embers
            WHERE
                identity_token = $1
                AND submitted_at >= $2
            ",
        )
        .bind(identity_token.as_str())
        .bind(encode_timestamp(&since))
        .fetch_one(&self.pool)
        .await
        .map_err(|err| SqlStorageError::Transaction(err.to_string()))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn hide_ember(
        &self,
        id: i64,
        note: &str,
        updated_at: NaiveDateTime,
    ) -> Result<bool, SqlStorageError> {
        let result = query(
            "
            UPDATE
                embers
            SET
                is_hidden = TRUE,
                admin_memo = CASE
                    WHEN admin_memo IS NULL OR admin_memo = '' THEN $1
                    ELSE admin_memo || $2 || $3
                END,
                updated_at = $4
            WHERE
                id = $5
            ",
        )
        .bind(note)
        .bind(MEMO_SEPARATOR)
        .bind(note)
        .bind(encode_timestamp(&updated_at))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| SqlStorageError::Transaction(err.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_admin_memo(
        &self,
        id: i64,
        admin_memo: &str,
        updated_at: NaiveDateTime,
    ) -> Result<bool, SqlStorageError> {
        let result = query(
            "
            UPDATE
                embers
            SET
                admin_memo = $1,
                updated_at = $2
            WHERE
                id = $3
            ",
        )
        .bind(admin_memo)
        .bind(encode_timestamp(&updated_at))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| SqlStorageError::Transaction(err.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rstest::rstest;

    use crate::db::traits::EmberStore;
    use crate::db::types::{ListScope, PageRequest};
    use crate::embers::Visibility;
    use crate::identity::IdentityToken;
    use crate::test_utils::{insert_ember, new_ember, test_runner, TestNode};

    #[rstest]
    fn insert_and_get() {
        test_runner(|node: TestNode| async move {
            let mut ember = new_ember("A quiet night by the fire", "雨の匂い");
            ember.client_signature = Some("Mozilla/5.0".into());
            ember.visibility = Visibility {
                timeline_public: true,
                passphrase_public: true,
                external_share: true,
                external_share_passphrase: false,
            };

            let inserted = node.context.store.insert_ember(&ember).await.unwrap();
            let fetched = node
                .context
                .store
                .get_ember(inserted.id)
                .await
                .unwrap()
                .unwrap();

            assert_eq!(inserted, fetched);
            assert_eq!(fetched.content, "A quiet night by the fire");
            assert_eq!(fetched.client_signature.as_deref(), Some("Mozilla/5.0"));
            assert!(fetched.visibility.passphrase_public);
            assert!(!fetched.is_hidden);
            assert!(fetched.admin_memo.is_none());
        });
    }

    #[rstest]
    fn ids_are_monotonic() {
        test_runner(|node: TestNode| async move {
            let first = insert_ember(&node.context.store, "First ember", "a").await;
            let second = insert_ember(&node.context.store, "Second ember", "a").await;
            assert!(second.id > first.id);
        });
    }

    #[rstest]
    fn unknown_id() {
        test_runner(|node: TestNode| async move {
            assert!(node.context.store.get_ember(404).await.unwrap().is_none());
            assert!(!node
                .context
                .store
                .hide_ember(404, "memo", chrono::Utc::now().naive_utc())
                .await
                .unwrap());
            assert!(!node
                .context
                .store
                .update_admin_memo(404, "memo", chrono::Utc::now().naive_utc())
                .await
                .unwrap());
        });
    }

    #[rstest]
    fn listing_scopes_and_order() {
        test_runner(|node: TestNode| async move {
            let store = &node.context.store;
            let base = chrono::Utc::now().naive_utc();

            let mut ids = Vec::new();
            for index in 0..12 {
                let mut ember = new_ember(&format!("Ember number {index}"), "tinder");
                ember.visibility.timeline_public = index != 0;
                // Backdated embers are sorted by their claimed time
                ember.created_at = base - Duration::minutes(index);
                ids.push(store.insert_ember(&ember).await.unwrap().id);
            }
            store.hide_ember(ids[1], "hidden", base).await.unwrap();

            let page = store
                .list_embers(ListScope::Public, PageRequest::new(1))
                .await
                .unwrap();
            assert_eq!(page.total, 10);
            assert_eq!(page.items.len(), 10);
            assert!(!page.has_next());
            assert_eq!(page.items[0].id, ids[2]);
            assert_eq!(page.items[9].id, ids[11]);

            let page = store
                .list_embers(ListScope::Everything, PageRequest::new(2))
                .await
                .unwrap();
            assert_eq!(page.total, 12);
            assert_eq!(page.items.len(), 2);
            assert!(page.has_prev());
            assert_eq!(page.items[1].id, ids[11]);
        });
    }

    #[rstest]
    fn count_submissions_by_identity() {
        test_runner(|node: TestNode| async move {
            let store = &node.context.store;
            let now = chrono::Utc::now().naive_utc();
            let token = IdentityToken::from_address("203.0.113.7", "salt").unwrap();

            for minutes_ago in [5, 30, 61, 120] {
                let mut ember = new_ember("Counting embers", "tinder");
                ember.identity_token = Some(token.clone());
                ember.submitted_at = now - Duration::minutes(minutes_ago);
                // A backdated claim does not change the real write time
                ember.created_at = now - Duration::days(3);
                store.insert_ember(&ember).await.unwrap();
            }

            let mut other = new_ember("Someone else", "tinder");
            other.identity_token = IdentityToken::from_address("203.0.113.8", "salt");
            other.submitted_at = now;
            store.insert_ember(&other).await.unwrap();

            let count = store
                .count_submissions_since(&token, now - Duration::minutes(60))
                .await
                .unwrap();
            assert_eq!(count, 2);
        });
    }

    #[rstest]
    fn hide_and_annotate() {
        test_runner(|node: TestNode| async move {
            let store = &node.context.store;
            let ember = insert_ember(store, "To be extinguished", "tinder").await;
            let later = ember.submitted_at + Duration::minutes(5);

            assert!(store.hide_ember(ember.id, "gone", later).await.unwrap());
            let hidden = store.get_ember(ember.id).await.unwrap().unwrap();
            assert!(hidden.is_hidden);
            assert_eq!(hidden.admin_memo.as_deref(), Some("gone"));
            assert_eq!(hidden.updated_at, later);

            assert!(store
                .update_admin_memo(ember.id, "", later)
                .await
                .unwrap());
            let annotated = store.get_ember(ember.id).await.unwrap().unwrap();
            assert!(annotated.is_hidden);
            assert_eq!(annotated.admin_memo.as_deref(), Some(""));
        });
    }

    #[rstest]
    fn hiding_appends_to_the_memo() {
        test_runner(|node: TestNode| async move {
            let store = &node.context.store;
            let ember = insert_ember(store, "Noted twice", "tinder").await;
            let later = ember.submitted_at + Duration::minutes(5);

            store
                .update_admin_memo(ember.id, "spam?", later)
                .await
                .unwrap();
            store.hide_ember(ember.id, "first", later).await.unwrap();
            store.hide_ember(ember.id, "second", later).await.unwrap();

            let hidden = store.get_ember(ember.id).await.unwrap().unwrap();
            assert_eq!(hidden.admin_memo.as_deref(), Some("spam?\nfirst\nsecond"));
        });
    }
}
