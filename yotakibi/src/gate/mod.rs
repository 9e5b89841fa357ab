// SPDX-License-Identifier: AGPL-3.0-or-later

//! Policies deciding who may enter the board, when, and how often they may write.
pub mod hours;
pub mod rate_limit;
pub mod role;
