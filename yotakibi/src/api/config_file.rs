// SPDX-License-Identifier: AGPL-3.0-or-later

use std::convert::TryFrom;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_GEMINI_MODEL, DEV_IP_SALT, DEV_SECRET_KEY};
use crate::{Configuration, SafetyScope};

const DEFAULT_LOG_LEVEL: &str = "off";

const DEFAULT_DATABASE_URL: &str = "sqlite:yotakibi.db";

const DEFAULT_MAX_DATABASE_CONNECTIONS: u32 = 32;

const DEFAULT_HTTP_PORT: u16 = 2020;

const DEFAULT_SAFETY_SCOPE: &str = "both";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

fn default_max_database_connections() -> u32 {
    DEFAULT_MAX_DATABASE_CONNECTIONS
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_secret_key() -> String {
    DEV_SECRET_KEY.to_string()
}

fn default_ip_salt() -> String {
    DEV_IP_SALT.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_safety_scope() -> String {
    DEFAULT_SAFETY_SCOPE.to_string()
}

/// Board configuration which can be de/serialized from a config file or environment variables.
///
/// Field names match the environment variables used in deployments (`SECRET_KEY`, `IP_SALT`,
/// `ADMIN_KEY`, `TICKET_KEY`, `AI_BOT_SECRET`, `GEMINI_API_KEY`, `DATABASE_URL`, ..).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Set log verbosity. Use this for learning more about how the board behaves or for
    /// debugging.
    ///
    /// Possible log levels are: ERROR, WARN, INFO, DEBUG, TRACE. They are scoped to "yotakibi"
    /// by default.
    ///
    /// If you want to adjust the scope for deeper inspection use a filter value, for example
    /// "=TRACE" for logging _everything_ or "yotakibi=INFO,sqlx=DEBUG" etc.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// URL / connection string to PostgreSQL or SQLite database. Defaults to a SQLite database
    /// file "yotakibi.db" in the current directory.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Max database connections, defaults to 32.
    #[serde(default = "default_max_database_connections")]
    pub database_max_connections: u32,

    /// HTTP port serving the board. Defaults to 2020.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Secret used to sign session cookies.
    ///
    /// WARNING: The default is only meant for local development. Anyone knowing it can forge
    /// administrator sessions.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// Salt mixed into hashed network addresses.
    ///
    /// WARNING: The default is only meant for local development.
    #[serde(default = "default_ip_salt")]
    pub ip_salt: String,

    /// Query token (`?admin_key=..`) granting administrator rights. Disabled when not set.
    #[serde(default)]
    pub admin_key: Option<String>,

    /// Query token (`?ticket=..`) letting visitors in outside of the opening hours. Disabled when
    /// not set.
    #[serde(default)]
    pub ticket_key: Option<String>,

    /// Secret the generation trigger has to send in its `X-Bot-Secret` header. Generation is
    /// disabled when not set.
    #[serde(default)]
    pub ai_bot_secret: Option<String>,

    /// API key for the Gemini generative-content API.
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Gemini model used for generated embers.
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Directory with static assets served under "/static".
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Fixed offset from UTC in hours to determine the opening hours, for example 9 for Japan.
    /// Uses the timezone of the host when not set.
    #[serde(default)]
    pub utc_offset_hours: Option<i32>,

    /// Which embers pass the content safety filter: "human", "generated" or "both". Defaults to
    /// "both".
    #[serde(default = "default_safety_scope")]
    pub safety_scope: String,

    /// Guests need to write an ember before they can read the board. Disabled by default.
    #[serde(default)]
    pub require_post_before_reading: bool,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            database_url: default_database_url(),
            database_max_connections: default_max_database_connections(),
            http_port: default_http_port(),
            secret_key: default_secret_key(),
            ip_salt: default_ip_salt(),
            admin_key: None,
            ticket_key: None,
            ai_bot_secret: None,
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            static_dir: None,
            utc_offset_hours: None,
            safety_scope: default_safety_scope(),
            require_post_before_reading: false,
        }
    }
}

/// Empty strings, as they easily appear through environment variables, count as "not set".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

impl TryFrom<ConfigFile> for Configuration {
    type Error = anyhow::Error;

    fn try_from(value: ConfigFile) -> Result<Self, Self::Error> {
        let safety_scope: SafetyScope = value.safety_scope.parse()?;

        if let Some(hours) = value.utc_offset_hours {
            if !(-23..=23).contains(&hours) {
                return Err(anyhow!(
                    "Invalid 'utc_offset_hours' value {hours}, needs to be between -23 and 23"
                ));
            }
        }

        if value.secret_key.is_empty() {
            return Err(anyhow!("'secret_key' can not be empty"));
        }

        Ok(Configuration {
            database_url: value.database_url,
            database_max_connections: value.database_max_connections,
            http_port: value.http_port,
            secret_key: value.secret_key,
            ip_salt: value.ip_salt,
            admin_key: non_empty(value.admin_key),
            ticket_key: non_empty(value.ticket_key),
            bot_secret: non_empty(value.ai_bot_secret),
            gemini_api_key: non_empty(value.gemini_api_key),
            gemini_model: value.gemini_model,
            static_dir: value.static_dir,
            utc_offset_hours: value.utc_offset_hours,
            safety_scope,
            require_post_before_reading: value.require_post_before_reading,
        })
    }
}
