// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Result;
use axum::extract::Extension;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use log::debug;
use tower_http::services::ServeDir;

use crate::context::Context;
use crate::gate::hours::CLOSED_ROUTE;
use crate::http::api::{
    handle_extinguish, handle_ignite, handle_listing, handle_manual, handle_memo, handle_rules,
    handle_search, handle_sleeping, handle_write, handle_write_form,
};
use crate::http::context::HttpServiceContext;
use crate::http::middleware::{gatekeeper, require_admin, require_kindled};
use crate::manager::Shutdown;

/// Route to the static file server
pub const STATIC_ROUTE: &str = "/static";

/// Route triggering generated embers
const IGNITE_ROUTE: &str = "/api/bot/ignite";

/// Build HTTP server with all routes of the board.
pub fn build_server(http_context: HttpServiceContext) -> Router {
    // Reading the board, guests might need to write first
    let reading = Router::new()
        .route("/", get(handle_listing))
        .route("/search", get(handle_search))
        .route_layer(from_fn(require_kindled));

    // Moderation, only for administrators
    let moderation = Router::new()
        .route("/extinguish/:id", post(handle_extinguish))
        .route("/memo/:id", post(handle_memo))
        .route_layer(from_fn(require_admin));

    let mut router = Router::new()
        .merge(reading)
        .merge(moderation)
        .route("/write", get(handle_write_form).post(handle_write))
        .route(CLOSED_ROUTE, get(handle_sleeping))
        .route("/rules", get(handle_rules))
        .route("/manual", get(handle_manual))
        .route(IGNITE_ROUTE, post(handle_ignite));

    // Add static file server when a directory was configured
    if let Some(static_dir) = &http_context.config.static_dir {
        router = router.nest_service(STATIC_ROUTE, ServeDir::new(static_dir));
    }

    router
        // Add middlewares
        .layer(from_fn(gatekeeper))
        // Add shared context
        .layer(Extension(http_context))
}

/// Start HTTP server.
pub async fn http_service(context: Context, signal: Shutdown) -> Result<()> {
    let http_port = context.config.http_port;
    let http_address = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), http_port);

    // Introduce a new context for all HTTP routes
    let http_context = HttpServiceContext::new(context);

    axum::Server::try_bind(&http_address)?
        .serve(build_server(http_context).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            debug!("HTTP service is ready");
            signal.await.ok();
        })
        .await?;

    Ok(())
}
