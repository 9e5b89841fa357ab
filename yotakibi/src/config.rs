// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Signing key used for session cookies when none was configured.
pub const DEV_SECRET_KEY: &str = "dev-key-keep-it-secret-yotakibi";

/// Salt for hashing network addresses when none was configured.
pub const DEV_IP_SALT: &str = "dev-salt-change-me";

/// Gemini model asked for generated embers.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Configuration object holding all important variables throughout the application.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// URL / connection string to PostgreSQL or SQLite database.
    pub database_url: String,

    /// Maximum number of connections that the database pool should maintain.
    pub database_max_connections: u32,

    /// HTTP port serving the board.
    pub http_port: u16,

    /// Secret used to sign the session cookie.
    pub secret_key: String,

    /// Salt mixed into every hashed network address.
    pub ip_salt: String,

    /// Secret query token turning a visitor into an administrator. Never matches when not set.
    pub admin_key: Option<String>,

    /// Secret query token turning a visitor into a ticket holder. Never matches when not set.
    pub ticket_key: Option<String>,

    /// Secret expected in the `X-Bot-Secret` header of generation requests. Generation is
    /// refused when not set.
    pub bot_secret: Option<String>,

    /// API key for the Gemini generative-content API. Generation is unavailable when not set.
    pub gemini_api_key: Option<String>,

    /// Model name used for generated embers.
    pub gemini_model: String,

    /// Directory served under `/static`, nothing is served when not set.
    pub static_dir: Option<PathBuf>,

    /// Fixed offset from UTC in hours for the opening hours. Uses the timezone of the host when
    /// not set.
    pub utc_offset_hours: Option<i32>,

    /// Which submissions pass through the content safety filter.
    pub safety_scope: SafetyScope,

    /// Guests need to have written an ember before they can read the listing or search.
    pub require_post_before_reading: bool,
}

impl Configuration {
    /// Returns true when session signing or address hashing still use the development defaults.
    pub fn uses_dev_secrets(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY || self.ip_salt == DEV_IP_SALT
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            database_max_connections: 32,
            http_port: 2020,
            secret_key: DEV_SECRET_KEY.into(),
            ip_salt: DEV_IP_SALT.into(),
            admin_key: None,
            ticket_key: None,
            bot_secret: None,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.into(),
            static_dir: None,
            utc_offset_hours: None,
            safety_scope: SafetyScope::default(),
            require_post_before_reading: false,
        }
    }
}

/// Submissions the content safety filter gets applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyScope {
    /// Only embers written by visitors.
    Human,

    /// Only embers produced by the generator.
    Generated,

    /// Every ember.
    Both,
}

impl SafetyScope {
    /// Returns true when human submissions get filtered.
    pub fn covers_human(&self) -> bool {
        matches!(self, SafetyScope::Human | SafetyScope::Both)
    }

    /// Returns true when generated submissions get filtered.
    pub fn covers_generated(&self) -> bool {
        matches!(self, SafetyScope::Generated | SafetyScope::Both)
    }
}

impl Default for SafetyScope {
    fn default() -> Self {
        Self::Both
    }
}

impl FromStr for SafetyScope {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "generated" => Ok(Self::Generated),
            "both" => Ok(Self::Both),
            _ => bail!("Unknown safety scope '{}', use human, generated or both", value),
        }
    }
}
