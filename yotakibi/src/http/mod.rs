// SPDX-License-Identifier: AGPL-3.0-or-later

mod api;
mod context;
mod extract;
mod middleware;
mod service;
mod session;

pub use context::HttpServiceContext;
pub use service::{build_server, http_service};
