// SPDX-License-Identifier: AGPL-3.0-or-later

//! Values passed into and returned from the store which don't map onto a single row.
mod ember;
mod page;

pub use ember::NewEmber;
pub use page::{ListScope, Page, PageRequest};
