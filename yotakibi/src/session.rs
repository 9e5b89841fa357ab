// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-client session slots.
//!
//! The session lives in a signed cookie on the client, see `http::session` for the transport. Only
//! the role resolver writes the role flags, handlers receive the resolved [`Role`] instead.
//!
//! [`Role`]: crate::gate::role::Role
use serde::{Deserialize, Serialize};

/// Kind of a flash notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Something was done.
    Success,

    /// Something was refused.
    Error,
}

/// One-time message shown with the next listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Kind of notice.
    pub level: NoticeLevel,

    /// Human-readable message.
    pub message: String,
}

impl Notice {
    /// Returns a success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Returns an error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Slots stored for every client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Client entered with the administrator key.
    pub is_admin: bool,

    /// Client entered with a ticket.
    pub is_ticket_holder: bool,

    /// Client has written at least one ember.
    pub has_posted: bool,

    /// Tinder of the last ember this client wrote.
    pub last_passphrase: Option<String>,

    /// Pending flash notices.
    pub notices: Vec<Notice>,
}

impl SessionState {
    /// Encodes the slots into a cookie-safe string.
    pub fn encode(&self) -> String {
        // Serializing plain structs with string keys can not fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(json)
    }

    /// Decodes slots from a cookie value, returns `None` for anything malformed.
    pub fn decode(value: &str) -> Option<Self> {
        let bytes = hex::decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Adds a flash notice.
    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Removes and returns all pending flash notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Remembers a successful write.
    pub fn record_post(&mut self, passphrase: &str) {
        self.has_posted = true;
        self.last_passphrase = Some(passphrase.to_owned());
    }
}
