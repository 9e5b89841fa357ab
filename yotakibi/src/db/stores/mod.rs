// SPDX-License-Identifier: AGPL-3.0-or-later

//! Implementations of the storage traits for [`SqlStore`](crate::db::SqlStore).
mod ember;
