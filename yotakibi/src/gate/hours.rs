// SPDX-License-Identifier: AGPL-3.0-or-later

//! The fire burns from 19:00 until 00:59.
//!
//! Outside of these hours guests get redirected to the closed page, which tells them whether they
//! came too early ("daytime") or should better be asleep ("midnight"). Ticket holders and
//! administrators pass at any time, as do the pages explaining the board.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gate::role::Role;

/// Hour the fire gets lit.
pub const OPENING_HOUR: u32 = 19;

/// Hour the fire goes out.
pub const CLOSING_HOUR: u32 = 1;

/// Hour after which a closed board counts as "too early" instead of "go to sleep".
pub const MORNING_HOUR: u32 = 6;

/// Route of the closed page.
pub const CLOSED_ROUTE: &str = "/sleeping";

/// Routes (and everything below them) which are reachable at any time.
pub const BYPASS_ROUTES: [&str; 5] = ["/static", "/rules", "/manual", CLOSED_ROUTE, "/api/bot"];

/// Why the board is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosedReason {
    /// Between closing and morning.
    Midnight,

    /// Between morning and opening.
    Daytime,
}

impl ClosedReason {
    /// Returns the reason for a closed hour.
    pub fn from_hour(hour: u32) -> Self {
        if hour < MORNING_HOUR {
            Self::Midnight
        } else {
            Self::Daytime
        }
    }

    /// Returns the query value of this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Midnight => "midnight",
            Self::Daytime => "daytime",
        }
    }
}

impl fmt::Display for ClosedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decision of the opening-hours gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through.
    Allow,

    /// Redirect to the closed page.
    Redirect {
        /// Why the board is closed.
        reason: ClosedReason,

        /// Target of the redirect.
        location: String,
    },
}

/// Returns true during opening hours.
pub fn is_open(hour: u32) -> bool {
    hour >= OPENING_HOUR || hour < CLOSING_HOUR
}

/// Returns true for routes reachable at any time.
pub fn is_bypass_route(path: &str) -> bool {
    BYPASS_ROUTES.iter().any(|route| {
        path == *route
            || path
                .strip_prefix(route)
                .map_or(false, |rest| rest.starts_with('/'))
    })
}

/// Decides whether a request may pass at the given local hour.
pub fn check(role: Role, hour: u32, path: &str) -> GateDecision {
    if role.bypasses_opening_hours() || is_bypass_route(path) || is_open(hour) {
        return GateDecision::Allow;
    }

    let reason = ClosedReason::from_hour(hour);
    GateDecision::Redirect {
        reason,
        location: format!("{}?reason={}", CLOSED_ROUTE, reason),
    }
}
