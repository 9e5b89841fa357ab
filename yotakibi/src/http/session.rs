// SPDX-License-Identifier: AGPL-3.0-or-later

//! Transport of session slots in a signed cookie.
//!
//! The gatekeeper loads the slots once per request and hands them to handlers through a
//! [`SessionHandle`] in the request extensions. After the handler finished, the cookie is only
//! written again when the slots changed.
use std::sync::{Arc, Mutex};

use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use sha2::{Digest, Sha512};

use crate::session::SessionState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "yotakibi_session";

/// Derives the 64 byte signing key from the configured secret.
pub fn cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Reads the session slots from the jar, missing or tampered cookies give an empty session.
pub fn load_session(jar: &SignedCookieJar) -> SessionState {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| SessionState::decode(cookie.value()))
        .unwrap_or_default()
}

/// Writes the session slots into the jar. The cookie lives as long as the browser session.
pub fn store_session(jar: SignedCookieJar, session: &SessionState) -> SignedCookieJar {
    let cookie = Cookie::build(SESSION_COOKIE, session.encode())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();

    jar.add(cookie)
}

/// Session slots of the current request, shared between middlewares and the handler.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle(Arc<Mutex<SessionState>>);

impl SessionHandle {
    /// Wraps loaded session slots.
    pub fn new(session: SessionState) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// Changes the slots.
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut session = self.0.lock().unwrap_or_else(|err| err.into_inner());
        f(&mut session)
    }

    /// Returns a copy of the current slots.
    pub fn snapshot(&self) -> SessionState {
        self.update(|session| session.clone())
    }
}
