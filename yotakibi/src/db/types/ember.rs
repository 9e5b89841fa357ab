// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::NaiveDateTime;

use crate::embers::Visibility;
use crate::identity::IdentityToken;

/// Validated ember ready to be inserted, the store assigns the sequential id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmber {
    /// Random external id.
    pub external_id: String,

    /// Text of the entry.
    pub content: String,

    /// Tinder of the entry.
    pub passphrase: String,

    /// Normalized visibility flags.
    pub visibility: Visibility,

    /// Hashed network address of the author.
    pub identity_token: Option<IdentityToken>,

    /// User agent of the author.
    pub client_signature: Option<String>,

    /// Claimed creation time, possibly backdated.
    pub created_at: NaiveDateTime,

    /// Real write time, also used as the initial update time.
    pub submitted_at: NaiveDateTime,
}
