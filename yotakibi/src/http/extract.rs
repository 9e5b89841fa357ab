// SPDX-License-Identifier: AGPL-3.0-or-later

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

/// Header set by reverse proxies with the original client address first.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Network address of the client, used to derive its identity token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress(pub Option<String>);

/// Returns the first forwarded address, or the address of the peer when nothing was forwarded.
pub fn client_address(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match forwarded {
        Some(address) => Some(address.to_owned()),
        None => connect_info.map(|ConnectInfo(address)| address.ip().to_string()),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientAddress
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let connect_info = parts.extensions.get::<ConnectInfo<SocketAddr>>();
        Ok(Self(client_address(&parts.headers, connect_info)))
    }
}
