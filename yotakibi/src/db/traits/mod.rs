// SPDX-License-Identifier: AGPL-3.0-or-later

//! Storage interfaces the gatekeeping engine depends on.
mod ember;

pub use ember::EmberStore;
