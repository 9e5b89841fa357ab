// SPDX-License-Identifier: AGPL-3.0-or-later

//! Embers written by a language model instead of a visitor.
//!
//! Generated embers keep the fire burning on quiet nights. They pass through the same submission
//! steps as every other ember, except for the rate limit.
mod gemini;

use std::fmt::Debug;

use async_trait::async_trait;
use serde::Deserialize;

pub use gemini::{GeminiGenerator, GEMINI_ENDPOINT, PROMPT};

/// Ember and tinder as produced by a generator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedEmber {
    /// Text of the ember.
    pub content: String,

    /// Tinder of the ember.
    #[serde(alias = "aikotoba")]
    pub passphrase: String,
}

/// Errors returned by generators. None of them leads to anything being written.
#[derive(thiserror::Error, Debug)]
pub enum GeneratorError {
    /// No API credential was configured.
    #[error("No API key configured for the generator")]
    MissingCredential,

    /// Upstream could not be reached.
    #[error("Generator request failed: {0}")]
    Request(String),

    /// Upstream answered with an error status.
    #[error("Generator answered with status {0}")]
    Status(u16),

    /// Upstream answer could not be understood.
    #[error("Generator returned malformed content: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GeneratorError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.without_url().to_string())
    }
}

/// Produces new embers.
#[async_trait]
pub trait EmberGenerator: Debug + Send + Sync {
    /// Asks for one new ember.
    async fn generate(&self) -> Result<GeneratedEmber, GeneratorError>;
}

/// Parses the JSON object a generator answered with.
///
/// Markdown code fences around the object are tolerated, missing or empty fields are not. Both
/// fields are trimmed, searching for tinder trims the query the same way.
pub fn parse_generated(text: &str) -> Result<GeneratedEmber, GeneratorError> {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .and_then(|inner| inner.strip_suffix("```"))
        .unwrap_or(text)
        .trim();

    let ember: GeneratedEmber =
        serde_json::from_str(text).map_err(|err| GeneratorError::Malformed(err.to_string()))?;

    let content = ember.content.trim();
    let passphrase = ember.passphrase.trim();
    if content.is_empty() || passphrase.is_empty() {
        return Err(GeneratorError::Malformed(
            "content or passphrase is empty".into(),
        ));
    }

    Ok(GeneratedEmber {
        content: content.to_owned(),
        passphrase: passphrase.to_owned(),
    })
}
