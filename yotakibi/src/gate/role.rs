// SPDX-License-Identifier: AGPL-3.0-or-later

//! Resolves the role of a visitor from session slots and secret query tokens.
//!
//! Visitors become administrators with `?admin_key=..`, ticket holders with `?ticket=..` and
//! plain guests again with `?guest=1`. Every such transition answers with a redirect to the same
//! path without the token, so secrets don't stay in browser histories or access logs.
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::session::SessionState;

/// Query parameter carrying the administrator key.
pub const ADMIN_KEY_PARAM: &str = "admin_key";

/// Query parameter carrying the ticket key.
pub const TICKET_PARAM: &str = "ticket";

/// Query parameter resetting a visitor to a guest.
pub const GUEST_PARAM: &str = "guest";

/// What a visitor is allowed to do during this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Anonymous visitor, restricted by opening hours and rate limits.
    Guest,

    /// Visitor with a ticket: may enter at any time, otherwise a guest.
    TicketHolder,

    /// Keeper of the fire: no gates, no limits, sees everything and moderates.
    Admin,
}

impl Role {
    /// Returns true for administrators.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Returns true when the opening hours don't apply.
    pub fn bypasses_opening_hours(&self) -> bool {
        matches!(self, Role::Admin | Role::TicketHolder)
    }
}

/// Role tokens found in the query of a request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleTokens {
    /// Value of `admin_key`.
    pub admin_key: Option<String>,

    /// Value of `ticket`.
    pub ticket: Option<String>,

    /// Value of `guest`.
    pub guest: Option<String>,
}

/// Configured secrets the tokens are compared against. Unset secrets never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleSecrets<'a> {
    /// Secret granting administrator rights.
    pub admin_key: Option<&'a str>,

    /// Secret granting a ticket.
    pub ticket_key: Option<&'a str>,
}

/// Outcome of resolving the role of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Role for this request.
    pub role: Role,

    /// Set when the role changed through a token, the request should be answered with a redirect
    /// to this target.
    pub redirect: Option<String>,
}

fn secret_matches(token: Option<&str>, secret: Option<&str>) -> bool {
    match (token, secret) {
        (Some(token), Some(secret)) if !secret.is_empty() => {
            token.as_bytes().ct_eq(secret.as_bytes()).into()
        }
        _ => false,
    }
}

/// Resolves the role of a request, updating the role slots of the session on transitions.
///
/// Rules in order, the first match wins:
///
/// 1. Correct admin key: become administrator, drop ticket
/// 2. Correct ticket: become ticket holder, drop administrator rights
/// 3. Non-empty guest marker: drop both
/// 4. Otherwise keep what the session says, defaulting to guest
///
/// The first three answer with a redirect to `path` without the role tokens.
pub fn resolve(
    session: &mut SessionState,
    tokens: &RoleTokens,
    secrets: &RoleSecrets<'_>,
    path: &str,
    query: Option<&str>,
) -> Resolution {
    let transition = if secret_matches(tokens.admin_key.as_deref(), secrets.admin_key) {
        session.is_admin = true;
        session.is_ticket_holder = false;
        Some(Role::Admin)
    } else if secret_matches(tokens.ticket.as_deref(), secrets.ticket_key) {
        session.is_admin = false;
        session.is_ticket_holder = true;
        Some(Role::TicketHolder)
    } else if tokens.guest.as_deref().map_or(false, |value| !value.is_empty()) {
        session.is_admin = false;
        session.is_ticket_holder = false;
        Some(Role::Guest)
    } else {
        None
    };

    match transition {
        Some(role) => Resolution {
            role,
            redirect: Some(strip_role_tokens(path, query)),
        },
        None => Resolution {
            role: session_role(session),
            redirect: None,
        },
    }
}

/// Returns the role the session slots describe.
pub fn session_role(session: &SessionState) -> Role {
    if session.is_admin {
        Role::Admin
    } else if session.is_ticket_holder {
        Role::TicketHolder
    } else {
        Role::Guest
    }
}

/// Rebuilds a request target without role tokens, keeping every other query parameter verbatim.
pub fn strip_role_tokens(path: &str, query: Option<&str>) -> String {
    let kept: Vec<&str> = query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            ![ADMIN_KEY_PARAM, TICKET_PARAM, GUEST_PARAM].contains(&key)
        })
        .collect();

    if kept.is_empty() {
        path.to_owned()
    } else {
        format!("{}?{}", path, kept.join("&"))
    }
}
