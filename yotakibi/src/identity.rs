// SPDX-License-Identifier: AGPL-3.0-or-later

//! Opaque audit tokens derived from network addresses.
//!
//! Addresses are never stored. They get mixed with a configured salt and hashed with SHA-256, the
//! resulting hex string identifies a client for rate limiting and audits only. This is no
//! cryptographic identity: anyone knowing the salt can test guesses.
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Address used to derive the identity token of generated embers.
pub const GENERATOR_ADDRESS: &str = "AI_FIRE_KEEPER_BOT";

/// Salted, hex-encoded SHA-256 hash of a network address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityToken(String);

impl IdentityToken {
    /// Hashes an address together with the salt.
    ///
    /// Returns `None` for empty addresses, these can not be attributed to anyone.
    pub fn from_address(address: &str, salt: &str) -> Option<Self> {
        if address.is_empty() {
            return None;
        }

        let mut hasher = Sha256::new();
        hasher.update(address.as_bytes());
        hasher.update(salt.as_bytes());
        Some(Self(hex::encode(hasher.finalize())))
    }

    /// Returns the hex representation of this token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IdentityToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}
