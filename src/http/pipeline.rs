//! The per-request pipeline behind admission control.
//!
//! ```text
//! (throttling middleware admitted the request)
//!     → RequestContext built from the inbound request
//!     → ConnectionGuard::acquire (strategy selects a server)
//!     → RequestForwarder::forward (502 on failure)
//!     → guard moved into the response body, released when the body is done
//!     → affinity cookie appended, if the strategy asked for one
//! ```

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use crate::http::server::AppState;
use crate::load_balancer::{AffinityCookie, ConnectionGuard, RequestContext};
use crate::observability::metrics;

/// Body of the response sent when a strategy breaks an internal invariant.
pub const INTERNAL_ERROR_BODY: &str = "Internal load balancer error";

/// Main proxy handler.
/// Selects a server, forwards the request, and keeps the selection alive
/// until the response body has been relayed.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let method = request.method().clone();

    tracing::info!(method = %method, path = %request.uri().path(), "Start processing request");

    let mut ctx = RequestContext::from_request(&request, peer);
    let guard = match ConnectionGuard::acquire(&state.balancer, &mut ctx) {
        Ok(guard) => guard,
        Err(e) => {
            tracing::error!(
                strategy = state.balancer.name(),
                error = %e,
                "Server selection failed"
            );
            metrics::record_request(method.as_str(), 500, "none", start);
            let response = (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response();
            return with_affinity_cookie(response, ctx.take_affinity_cookie());
        }
    };

    let server = guard.server().clone();
    tracing::debug!(strategy = state.balancer.name(), server = %server.url(), "Server selected");

    let response = state.forwarder.forward(&server, request).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), server.url(), start);

    let response = release_after_body(response, guard);
    with_affinity_cookie(response, ctx.take_affinity_cookie())
}

/// Tie the guard's lifetime to the response body.
///
/// The guard drops when the body stream finishes or when the client goes away
/// and the body is discarded.
fn release_after_body(response: Response, guard: ConnectionGuard) -> Response {
    let (parts, body) = response.into_parts();
    let stream = body.into_data_stream().map(move |chunk| {
        let _held = &guard;
        chunk
    });
    Response::from_parts(parts, Body::from_stream(stream))
}

fn with_affinity_cookie(mut response: Response, cookie: Option<AffinityCookie>) -> Response {
    if let Some(value) = cookie.as_ref().and_then(AffinityCookie::to_header_value) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}
