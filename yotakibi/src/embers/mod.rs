// SPDX-License-Identifier: AGPL-3.0-or-later

//! Embers and their lifecycle.
//!
//! An ember is created once through [`Submitter::submit`](submit::Submitter::submit) and
//! afterwards only touched by moderation: it can get extinguished (hidden) or annotated with a
//! memo, see [`moderation`].
//! Embers are never physically deleted.
pub mod moderation;
pub mod submit;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::gate::role::Role;
use crate::identity::IdentityToken;

/// Inclusive bounds for the number of characters in an ember.
pub const CONTENT_LENGTH: (usize, usize) = (4, 2000);

/// Inclusive bounds for the number of characters in tinder.
pub const PASSPHRASE_LENGTH: (usize, usize) = (2, 30);

/// Who may see an ember and its tinder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Visibility {
    /// Ember shows up in the public listing.
    pub timeline_public: bool,

    /// Tinder is shown next to the ember in listings.
    pub passphrase_public: bool,

    /// Ember may be shared on external services.
    pub external_share: bool,

    /// Tinder may be shared on external services together with the ember.
    pub external_share_passphrase: bool,
}

impl Visibility {
    /// Forces dependent flags off when the flag they depend on is off.
    ///
    /// Showing tinder requires the ember to be on the timeline, sharing tinder externally requires
    /// sharing the ember externally.
    pub fn normalized(self) -> Self {
        Self {
            timeline_public: self.timeline_public,
            passphrase_public: self.passphrase_public && self.timeline_public,
            external_share: self.external_share,
            external_share_passphrase: self.external_share_passphrase && self.external_share,
        }
    }
}

/// A diary entry thrown into the fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ember {
    /// Sequential id assigned by the store.
    pub id: i64,

    /// Random id for links which should not reveal the sequence.
    pub external_id: String,

    /// Text of the entry.
    pub content: String,

    /// Tinder the entry can be found with. Many embers can share the same tinder.
    pub passphrase: String,

    /// Visibility flags, always normalized.
    pub visibility: Visibility,

    /// Extinguished by moderation.
    pub is_hidden: bool,

    /// Notes of the administrators.
    pub admin_memo: Option<String>,

    /// Hashed network address of the author.
    pub identity_token: Option<IdentityToken>,

    /// User agent of the author.
    pub client_signature: Option<String>,

    /// Time the ember claims to be written, administrators can backdate it.
    pub created_at: NaiveDateTime,

    /// Time the ember was actually written.
    pub submitted_at: NaiveDateTime,

    /// Time of the last change.
    pub updated_at: NaiveDateTime,
}

/// Ember as presented to a visitor with a certain role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmberView {
    /// Sequential id.
    pub id: i64,

    /// Text of the entry.
    pub content: String,

    /// Tinder, only when public or for administrators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,

    /// Ember may be shared externally.
    pub allow_external_share: bool,

    /// Tinder may be shared externally.
    pub allow_external_share_of_passphrase: bool,

    /// Time the ember claims to be written.
    pub created_at: NaiveDateTime,

    /// Moderation details, only for administrators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderation: Option<ModerationView>,
}

/// Details of an ember only administrators get to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationView {
    /// Random external id.
    pub external_id: String,

    /// Ember shows up in the public listing.
    pub is_timeline_public: bool,

    /// Tinder shows up in the public listing.
    pub is_passphrase_public: bool,

    /// Extinguished by moderation.
    pub is_hidden: bool,

    /// Notes of the administrators.
    pub admin_memo: Option<String>,

    /// Hashed network address of the author.
    pub identity_token: Option<IdentityToken>,

    /// User agent of the author.
    pub client_signature: Option<String>,

    /// Time the ember was actually written.
    pub submitted_at: NaiveDateTime,

    /// Time of the last change.
    pub updated_at: NaiveDateTime,
}

impl EmberView {
    /// Presents an ember to a visitor with the given role.
    pub fn for_role(ember: &Ember, role: Role) -> Self {
        let show_passphrase = role.is_admin() || ember.visibility.passphrase_public;

        let moderation = if role.is_admin() {
            Some(ModerationView {
                external_id: ember.external_id.clone(),
                is_timeline_public: ember.visibility.timeline_public,
                is_passphrase_public: ember.visibility.passphrase_public,
                is_hidden: ember.is_hidden,
                admin_memo: ember.admin_memo.clone(),
                identity_token: ember.identity_token.clone(),
                client_signature: ember.client_signature.clone(),
                submitted_at: ember.submitted_at,
                updated_at: ember.updated_at,
            })
        } else {
            None
        };

        Self {
            id: ember.id,
            content: ember.content.clone(),
            passphrase: show_passphrase.then(|| ember.passphrase.clone()),
            allow_external_share: ember.visibility.external_share,
            allow_external_share_of_passphrase: ember.visibility.external_share_passphrase,
            created_at: ember.created_at,
            moderation,
        }
    }
}
