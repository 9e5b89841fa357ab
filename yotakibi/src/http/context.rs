// SPDX-License-Identifier: AGPL-3.0-or-later

use std::ops::Deref;

use axum_extra::extract::cookie::Key;

use crate::context::Context;
use crate::http::session::cookie_key;

#[derive(Clone)]
pub struct HttpServiceContext {
    /// Data shared with all other services.
    pub context: Context,

    /// Key signing the session cookie, derived from the configured secret.
    pub cookie_key: Key,
}

impl HttpServiceContext {
    /// Create a new HttpServiceContext.
    pub fn new(context: Context) -> Self {
        let cookie_key = cookie_key(&context.config.secret_key);

        Self {
            context,
            cookie_key,
        }
    }
}

impl Deref for HttpServiceContext {
    type Target = Context;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}
