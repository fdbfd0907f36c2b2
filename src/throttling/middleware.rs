//! Throttling middleware: the first stage of the request pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;
use crate::throttling::SlidingWindow;

/// Body of every throttled response.
pub const THROTTLED_BODY: &str = "The server is busy. Please, try again later";

/// Reject the request with 429 when the admission controller says no.
pub async fn throttle_middleware(
    State(throttle): State<Arc<SlidingWindow>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if throttle.try_admit() {
        tracing::debug!("Request allowed by throttling strategy");
        return next.run(request).await;
    }

    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    tracing::warn!(client = %client, "Request throttled - too many requests");
    metrics::record_throttled();

    let mut response = Response::new(Body::from(THROTTLED_BODY));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
