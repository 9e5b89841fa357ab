// SPDX-License-Identifier: AGPL-3.0-or-later

//! # yotakibi
//!
//! A small bonfire of anonymous diary entries ("embers"), open only at night.
//!
//! Visitors throw an ember into the fire together with a passphrase ("tinder") and can later find
//! their own and others' embers again by that passphrase. The board opens at 19:00 and closes at
//! 01:00; ticket holders and administrators can enter at any time.
//!
//! This crate contains the gatekeeping engine deciding who may do what and when:
//!
//! - Role resolution from session state and secret query tokens ([`gate::role`])
//! - Opening-hours gate redirecting to the closed page ([`gate::hours`])
//! - Per-identity rate limiting of writes ([`gate::rate_limit`])
//! - Content safety filter for embers and tinder ([`safety`])
//! - Role-dependent search strategies ([`search`])
//! - Entry lifecycle: submission and moderation ([`embers`])
//!
//! Together with an SQL store (SQLite or PostgreSQL) and an HTTP service exposing everything as
//! JSON, started via [`Node`].
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

mod api;
pub mod clock;
mod config;
mod context;
pub mod db;
pub mod embers;
pub mod gate;
pub mod generator;
mod http;
pub mod identity;
mod manager;
mod node;
pub mod safety;
pub mod search;
pub mod seed;
pub mod session;
#[cfg(test)]
mod test_utils;

pub use crate::api::ConfigFile;
pub use crate::config::{Configuration, SafetyScope};
pub use crate::node::Node;
