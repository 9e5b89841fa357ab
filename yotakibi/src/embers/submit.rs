// SPDX-License-Identifier: AGPL-3.0-or-later

//! Throwing a new ember into the fire.
//!
//! Every write passes the same steps in this order, the first failing step rejects it:
//!
//! 1. Dependent visibility flags get normalized
//! 2. Rate limit, unless written by an administrator or the generator
//! 3. Presence and length of ember and tinder, tinder without surrounding whitespace
//! 4. Content safety filter, if the configured scope covers the origin
//! 5. Effective creation time, administrators may backdate
//! 6. Persist and remember the tinder in the session
use chrono::NaiveDateTime;
use log::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::SafetyScope;
use crate::db::errors::SqlStorageError;
use crate::db::traits::EmberStore;
use crate::db::types::NewEmber;
use crate::embers::{Ember, Visibility, CONTENT_LENGTH, PASSPHRASE_LENGTH};
use crate::gate::rate_limit::{self, IdentityLocks, RateLimitDecision, RATE_LIMIT_MESSAGE};
use crate::gate::role::Role;
use crate::identity::{IdentityToken, GENERATOR_ADDRESS};
use crate::safety::{SafetyPolicy, SafetyRejection};
use crate::session::SessionState;

/// Formats administrators can backdate embers with.
pub const CUSTOM_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// User agent recorded for generated embers.
pub const GENERATOR_SIGNATURE: &str = "Yotakibi AI FireKeeper/1.0";

/// Where an ember comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Written by a visitor.
    Human,

    /// Produced by the generator.
    Generated,
}

/// Ember as handed in by its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Text of the ember.
    pub content: String,

    /// Tinder of the ember.
    pub passphrase: String,

    /// Requested visibility, normalized during submission.
    pub visibility: Visibility,

    /// Backdated creation time, only honoured for administrators.
    pub custom_time: Option<String>,

    /// Where the ember comes from.
    pub origin: Origin,
}

/// Who writes an ember.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Role of the author during this request.
    pub role: Role,

    /// Hashed network address of the author.
    pub identity_token: Option<IdentityToken>,

    /// User agent of the author.
    pub client_signature: Option<String>,
}

impl Author {
    /// Returns the author of generated embers.
    pub fn generator(ip_salt: &str) -> Self {
        Self {
            role: Role::Guest,
            identity_token: IdentityToken::from_address(GENERATOR_ADDRESS, ip_salt),
            client_signature: Some(GENERATOR_SIGNATURE.to_owned()),
        }
    }
}

/// Malformed submissions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Ember or tinder is missing.
    #[error("An ember and its tinder are both needed.")]
    Missing,

    /// Ember is too long.
    #[error("This ember is too large for the fire (up to {} characters).", CONTENT_LENGTH.1)]
    ContentTooLong,

    /// Ember is too short.
    #[error("This ember would burn out at once (at least {} characters).", CONTENT_LENGTH.0)]
    ContentTooShort,

    /// Tinder is too long.
    #[error("This tinder is too long to remember (up to {} characters).", PASSPHRASE_LENGTH.1)]
    PassphraseTooLong,

    /// Tinder is too short.
    #[error("This tinder would go out at once (at least {} characters).", PASSPHRASE_LENGTH.0)]
    PassphraseTooShort,
}

/// Well-formed submissions the policies don't allow.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyRejection {
    /// Author wrote too much recently.
    #[error("{}", RATE_LIMIT_MESSAGE)]
    RateLimited,

    /// Content safety filter rejected ember or tinder.
    #[error(transparent)]
    Safety(#[from] SafetyRejection),
}

/// Errors returned by [`Submitter::submit`].
#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    /// Submission is malformed.
    #[error("{source}")]
    Invalid {
        /// Reason.
        source: ValidationError,

        /// Text of the ember to hand back to the author.
        content: String,
    },

    /// Submission was refused by a policy.
    #[error("{source}")]
    Rejected {
        /// Reason.
        source: PolicyRejection,

        /// Text of the ember to hand back to the author.
        content: String,
    },

    /// Storage failed.
    #[error("Ember could not be stored: {0}")]
    Store(#[from] SqlStorageError),
}

impl SubmitError {
    /// Text of the rejected ember, tinder is never handed back.
    pub fn preserved_content(&self) -> Option<&str> {
        match self {
            SubmitError::Invalid { content, .. } | SubmitError::Rejected { content, .. } => {
                Some(content)
            }
            SubmitError::Store(_) => None,
        }
    }
}

/// Checks text presence and lengths in characters.
///
/// Text consisting of whitespace only counts as missing, otherwise the text is measured as given.
pub fn validate(content: &str, passphrase: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() || passphrase.trim().is_empty() {
        return Err(ValidationError::Missing);
    }

    let content_length = content.chars().count();
    if content_length > CONTENT_LENGTH.1 {
        return Err(ValidationError::ContentTooLong);
    }
    if content_length < CONTENT_LENGTH.0 {
        return Err(ValidationError::ContentTooShort);
    }

    let passphrase_length = passphrase.chars().count();
    if passphrase_length > PASSPHRASE_LENGTH.1 {
        return Err(ValidationError::PassphraseTooLong);
    }
    if passphrase_length < PASSPHRASE_LENGTH.0 {
        return Err(ValidationError::PassphraseTooShort);
    }

    Ok(())
}

/// Returns the time an ember claims to be written.
///
/// Administrators can backdate with a custom time, anything unparseable falls back to `now` and
/// times in the future are clamped to `now`.
pub fn effective_time(role: Role, custom_time: Option<&str>, now: NaiveDateTime) -> NaiveDateTime {
    let custom_time = match custom_time.map(str::trim) {
        Some(value) if role.is_admin() && !value.is_empty() => value,
        _ => return now,
    };

    CUSTOM_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(custom_time, format).ok())
        .map_or(now, |time| time.min(now))
}

/// Everything needed to accept new embers.
#[derive(Debug)]
pub struct Submitter<'a, S> {
    /// Storage of embers.
    pub store: &'a S,

    /// Content safety filter.
    pub safety: &'a SafetyPolicy,

    /// Origins the safety filter applies to.
    pub scope: SafetyScope,

    /// Locks serialising writes per identity.
    pub locks: &'a IdentityLocks,

    /// Source of the current time.
    pub clock: &'a dyn Clock,
}

impl<'a, S: EmberStore + Sync> Submitter<'a, S> {
    /// Validates and stores a new ember.
    ///
    /// On success the tinder is remembered in the session, if one is given.
    pub async fn submit(
        &self,
        submission: Submission,
        author: &Author,
        session: Option<&mut SessionState>,
    ) -> Result<Ember, SubmitError> {
        let Submission {
            content,
            passphrase,
            visibility,
            custom_time,
            origin,
        } = submission;

        let visibility = visibility.normalized();
        // Tinder is looked up by exact match of a trimmed query
        let passphrase = passphrase.trim().to_owned();
        let limited = !author.role.is_admin() && origin == Origin::Human;

        // Hold the lock of this identity until the ember is stored
        let _guard = match (&author.identity_token, limited) {
            (Some(token), true) => Some(self.locks.acquire(token).await),
            _ => None,
        };

        let now = self.clock.now();

        if limited {
            let decision = rate_limit::check(
                self.store,
                author.identity_token.as_ref(),
                now,
                author.role,
            )
            .await?;

            if decision == RateLimitDecision::Deny {
                return Err(SubmitError::Rejected {
                    source: PolicyRejection::RateLimited,
                    content,
                });
            }
        }

        if let Err(err) = validate(&content, &passphrase) {
            debug!("Invalid submission: {}", err);
            return Err(SubmitError::Invalid {
                source: err,
                content,
            });
        }

        let filtered = match origin {
            Origin::Human => self.scope.covers_human(),
            Origin::Generated => self.scope.covers_generated(),
        };

        if filtered {
            let is_admin = author.role.is_admin();
            let checked = self
                .safety
                .check(&passphrase, true, is_admin)
                .and_then(|_| self.safety.check(&content, false, is_admin));

            if let Err(rejection) = checked {
                info!("Safety filter rejected a {:?} submission: {}", origin, rejection);
                return Err(SubmitError::Rejected {
                    source: PolicyRejection::Safety(rejection),
                    content,
                });
            }
        }

        let created_at = effective_time(author.role, custom_time.as_deref(), now);

        let ember = self
            .store
            .insert_ember(&NewEmber {
                external_id: Uuid::new_v4().to_string(),
                content,
                passphrase,
                visibility,
                identity_token: author.identity_token.clone(),
                client_signature: author.client_signature.clone(),
                created_at,
                submitted_at: now,
            })
            .await?;

        info!("Ember #{} thrown into the fire", ember.id);

        if let Some(session) = session {
            session.record_post(&ember.passphrase);
        }

        Ok(ember)
    }
}
