// SPDX-License-Identifier: AGPL-3.0-or-later

use std::convert::TryFrom;

use sqlx::FromRow;

use crate::db::errors::SqlStorageError;
use crate::db::utils::decode_timestamp;
use crate::embers::{Ember, Visibility};
use crate::identity::IdentityToken;

/// Representation of a row from the `embers` table as stored in the database.
#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
pub struct EmberRow {
    /// Sequential id.
    pub id: i64,

    /// Random external id.
    pub external_id: String,

    /// Text of the entry.
    pub content: String,

    /// Tinder of the entry.
    pub passphrase: String,

    /// Ember shows up in the public listing.
    pub is_timeline_public: bool,

    /// Tinder shows up in the public listing.
    pub is_passphrase_public: bool,

    /// Ember may be shared externally.
    pub allow_external_share: bool,

    /// Tinder may be shared externally.
    pub allow_external_share_of_passphrase: bool,

    /// Extinguished by moderation.
    pub is_hidden: bool,

    /// Notes of the administrators.
    pub admin_memo: Option<String>,

    /// Hex-encoded identity token.
    pub identity_token: Option<String>,

    /// User agent of the author.
    pub client_signature: Option<String>,

    /// Claimed creation time in `TIMESTAMP_FORMAT`.
    pub created_at: String,

    /// Real write time.
    pub submitted_at: String,

    /// Time of the last change.
    pub updated_at: String,
}

impl TryFrom<EmberRow> for Ember {
    type Error = SqlStorageError;

    fn try_from(row: EmberRow) -> Result<Self, Self::Error> {
        let timestamp = |value: &str| {
            decode_timestamp(value).map_err(|err| {
                SqlStorageError::Deserialization("embers".into(), err.to_string())
            })
        };

        Ok(Ember {
            id: row.id,
            created_at: timestamp(&row.created_at)?,
            submitted_at: timestamp(&row.submitted_at)?,
            updated_at: timestamp(&row.updated_at)?,
            external_id: row.external_id,
            content: row.content,
            passphrase: row.passphrase,
            visibility: Visibility {
                timeline_public: row.is_timeline_public,
                passphrase_public: row.is_passphrase_public,
                external_share: row.allow_external_share,
                external_share_passphrase: row.allow_external_share_of_passphrase,
            },
            is_hidden: row.is_hidden,
            admin_memo: row.admin_memo,
            identity_token: row.identity_token.map(IdentityToken::from),
            client_signature: row.client_signature,
        })
    }
}
