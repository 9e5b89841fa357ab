// SPDX-License-Identifier: AGPL-3.0-or-later

//! Content safety filter for embers and tinder.
//!
//! Restrictions are intentionally few: impersonating the keeper of the fire, passphrases claiming
//! to be official and announcements of crimes. Everything else is left to the eyes of the
//! administrators who can extinguish embers.
//!
//! A text passes three tiers, the first matching tier rejects it:
//!
//! 1. Globally banned terms (case-sensitive substrings), for everyone
//! 2. Administrator impersonation patterns (case-insensitive regular expressions), skipped for
//!    administrators
//! 3. Reserved terms (case-sensitive substrings), only checked for tinder and skipped for
//!    administrators
use regex::{Regex, RegexBuilder};

/// Terms nobody may use, not even administrators.
pub const BANNED_TERMS: [&str; 4] = ["殺す", "殺害", "爆破予告", "死ね"];

/// Patterns matching the name of the keeper.
pub const IMPERSONATION_PATTERNS: [&str; 1] = [r"falo"];

/// Terms in tinder reserved for operators: the name of the service and official roles.
pub const RESERVED_TERMS: [&str; 12] = [
    "夜焚き火",
    "よたきび",
    "ヨタキビ",
    "yotakibi",
    "Yotakibi",
    "YOTAKIBI",
    "管理人",
    "admin",
    "Admin",
    "official",
    "公式",
    "運営",
];

/// Reasons for rejecting a text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SafetyRejection {
    /// Text contains a globally banned term.
    #[error("These words can not be thrown into the fire.")]
    Banned,

    /// Text contains the name of the keeper.
    #[error("The name of the keeper can not be used.")]
    Impersonation,

    /// Tinder contains a term reserved for operators.
    #[error("Tinder containing \"{0}\" is reserved for the keeper.")]
    Reserved(String),
}

/// Word lists and patterns the filter checks against.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    banned: Vec<String>,
    impersonation: Vec<Regex>,
    reserved: Vec<String>,
}

impl SafetyPolicy {
    /// Returns a policy from custom lists. Impersonation patterns are matched case-insensitive.
    pub fn new<S: AsRef<str>>(
        banned: &[S],
        impersonation: &[S],
        reserved: &[S],
    ) -> Result<Self, regex::Error> {
        let impersonation = impersonation
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern.as_ref())
                    .case_insensitive(true)
                    .build()
            })
            .collect::<Result<Vec<Regex>, regex::Error>>()?;

        Ok(Self {
            banned: banned.iter().map(|term| term.as_ref().to_owned()).collect(),
            impersonation,
            reserved: reserved.iter().map(|term| term.as_ref().to_owned()).collect(),
        })
    }

    /// Returns the policy of the board.
    pub fn standard() -> Result<Self, regex::Error> {
        Self::new(&BANNED_TERMS, &IMPERSONATION_PATTERNS, &RESERVED_TERMS)
    }

    /// Checks a text against all tiers of the policy.
    ///
    /// Set `check_reserved` for tinder, not for the content of an ember. Empty texts pass.
    pub fn check(
        &self,
        text: &str,
        check_reserved: bool,
        is_admin: bool,
    ) -> Result<(), SafetyRejection> {
        if text.is_empty() {
            return Ok(());
        }

        if self.banned.iter().any(|term| text.contains(term.as_str())) {
            return Err(SafetyRejection::Banned);
        }

        if is_admin {
            return Ok(());
        }

        if self.impersonation.iter().any(|regex| regex.is_match(text)) {
            return Err(SafetyRejection::Impersonation);
        }

        if check_reserved {
            if let Some(term) = self.reserved.iter().find(|term| text.contains(term.as_str())) {
                return Err(SafetyRejection::Reserved(term.clone()));
            }
        }

        Ok(())
    }
}
