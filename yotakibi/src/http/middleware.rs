// SPDX-License-Identifier: AGPL-3.0-or-later

//! Policies every request passes before it reaches a handler.
//!
//! [`gatekeeper`] wraps all routes: it loads the session, resolves the role and applies the
//! opening hours. [`require_admin`] and [`require_kindled`] are layered onto the routes which
//! need them.
use axum::extract::{Extension, Query};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use log::{debug, info, warn};

use crate::gate::hours::{self, GateDecision};
use crate::gate::role::{self, Role, RoleSecrets, RoleTokens};
use crate::http::context::HttpServiceContext;
use crate::http::session::{load_session, store_session, SessionHandle};
use crate::session::{Notice, SessionState};

/// Notice for visitors trying to moderate.
pub const NOT_ALLOWED_MESSAGE: &str = "This action is not allowed.";

/// Notice for guests who need to write before they can read.
pub const KINDLE_FIRST_MESSAGE: &str = "Throw an ember into the fire first, then look around.";

/// Writes the session cookie when the slots changed during the request.
fn finish(
    jar: SignedCookieJar,
    initial: &SessionState,
    session: &SessionState,
    response: Response,
) -> Response {
    if session == initial {
        return response;
    }

    (store_session(jar, session), response).into_response()
}

/// Resolves the role of the visitor and keeps guests out outside of the opening hours.
///
/// Handlers find the resolved [`Role`] and a [`SessionHandle`] in the request extensions.
pub async fn gatekeeper<B>(
    Extension(context): Extension<HttpServiceContext>,
    mut request: Request<B>,
    next: Next<B>,
) -> Response {
    let jar = SignedCookieJar::from_headers(request.headers(), context.cookie_key.clone());
    let initial = load_session(&jar);
    let mut session = initial.clone();

    // Malformed queries carry no role tokens
    let tokens = Query::<RoleTokens>::try_from_uri(request.uri())
        .map(|Query(tokens)| tokens)
        .unwrap_or_default();
    let secrets = RoleSecrets {
        admin_key: context.config.admin_key.as_deref(),
        ticket_key: context.config.ticket_key.as_deref(),
    };

    let path = request.uri().path().to_owned();
    let resolution = role::resolve(
        &mut session,
        &tokens,
        &secrets,
        &path,
        request.uri().query(),
    );

    if let Some(target) = resolution.redirect {
        info!("Visitor continues as {:?}", resolution.role);
        return finish(jar, &initial, &session, Redirect::to(&target).into_response());
    }

    if let GateDecision::Redirect { reason, location } =
        hours::check(resolution.role, context.clock.hour(), &path)
    {
        debug!("Fire is out ({}), turning away request to {}", reason, path);
        return finish(jar, &initial, &session, Redirect::to(&location).into_response());
    }

    let handle = SessionHandle::new(session);
    request.extensions_mut().insert(resolution.role);
    request.extensions_mut().insert(handle.clone());

    let response = next.run(request).await;
    finish(jar, &initial, &handle.snapshot(), response)
}

/// Sends everyone but administrators back to the listing with a notice.
pub async fn require_admin<B>(
    Extension(role): Extension<Role>,
    Extension(session): Extension<SessionHandle>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    if role.is_admin() {
        return next.run(request).await;
    }

    warn!("Refused moderation of {} by {:?}", request.uri().path(), role);
    session.update(|session| session.push_notice(Notice::error(NOT_ALLOWED_MESSAGE)));
    Redirect::to("/").into_response()
}

/// Sends guests to the write page until they wrote their first ember, when configured.
pub async fn require_kindled<B>(
    Extension(context): Extension<HttpServiceContext>,
    Extension(role): Extension<Role>,
    Extension(session): Extension<SessionHandle>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let kindled = !context.config.require_post_before_reading
        || role != Role::Guest
        || session.snapshot().has_posted;

    if kindled {
        return next.run(request).await;
    }

    session.update(|session| session.push_notice(Notice::error(KINDLE_FIRST_MESSAGE)));
    Redirect::to("/write").into_response()
}
