//! Request forwarding to the selected upstream.
//!
//! # Responsibilities
//! - Rewrite the inbound URI onto the upstream's origin
//! - Copy headers in two tiers (message headers, content headers with the body)
//! - Stream request and response bodies without buffering
//! - Map transport failures to 502 Bad Gateway
//!
//! # Design Decisions
//! - One attempt per request; no retries
//! - The outbound call resolves at response headers, the body is relayed as it arrives
//! - Dropping the inbound request future drops the outbound call with it, so
//!   a client disconnect aborts the upstream request

use std::error::Error as StdError;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode, Uri},
    response::IntoResponse,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::config::TimeoutConfig;
use crate::http::headers::SplitHeaders;
use crate::load_balancer::Server;

/// Why a request could not be relayed.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("failed to build upstream request: {0}")]
    Build(#[from] axum::http::Error),

    #[error("{}", describe(.0))]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

/// Flatten an error and its sources into one line.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Relays requests to upstream servers over a pooled HTTP client.
#[derive(Clone)]
pub struct RequestForwarder {
    client: Client<HttpConnector, Body>,
    upstream_timeout: Duration,
}

impl RequestForwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(60))
            .build(connector);

        Self::with_client(client, Duration::from_secs(timeouts.upstream_secs))
    }

    pub fn with_client(client: Client<HttpConnector, Body>, upstream_timeout: Duration) -> Self {
        Self {
            client,
            upstream_timeout,
        }
    }

    /// Forward `request` to `server`. Failures become a 502 response; this
    /// never returns an error.
    pub async fn forward(&self, server: &Server, request: Request<Body>) -> Response<Body> {
        match self.try_forward(server, request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(server = %server.url(), error = %e, "Error forwarding request");
                bad_gateway(&e)
            }
        }
    }

    /// Forward `request` to `server`, surfacing failures to the caller.
    pub async fn try_forward(
        &self,
        server: &Server,
        request: Request<Body>,
    ) -> Result<Response<Body>, ForwardError> {
        let outbound = build_outbound(server, request)?;
        tracing::info!(method = %outbound.method(), target = %outbound.uri(), "Forwarding request");

        let upstream = tokio::time::timeout(self.upstream_timeout, self.client.request(outbound))
            .await
            .map_err(|_| ForwardError::Timeout(self.upstream_timeout))??;

        tracing::info!(
            server = %server.url(),
            status = upstream.status().as_u16(),
            "Response from upstream"
        );

        let (parts, body) = upstream.into_parts();
        let mut response = Response::new(Body::new(body));
        *response.status_mut() = parts.status;
        *response.headers_mut() = SplitHeaders::from_headers(&parts.headers).into_all();
        Ok(response)
    }
}

/// Build the upstream request: same method, upstream origin, inbound path and query.
pub fn build_outbound(server: &Server, request: Request<Body>) -> Result<Request<Body>, ForwardError> {
    let (parts, body) = request.into_parts();
    let uri = target_uri(server.base_url(), &parts.uri)?;
    let headers = SplitHeaders::from_headers(&parts.headers);

    let mut builder = Request::builder().method(parts.method).uri(uri);
    if let Some(target) = builder.headers_mut() {
        *target = headers.message;
    }

    let body = if declares_body(&parts.headers) {
        if let Some(target) = builder.headers_mut() {
            for (name, value) in &headers.content {
                target.append(name.clone(), value.clone());
            }
        }
        body
    } else {
        Body::empty()
    };

    Ok(builder.body(body)?)
}

/// Join the upstream origin with the inbound path and query.
///
/// The inbound path replaces any path on the upstream URL; scheme, host and
/// port always come from the upstream.
pub fn target_uri(base: &Url, inbound: &Uri) -> Result<Uri, ForwardError> {
    let mut target = base.clone();
    target.set_path(inbound.path());
    target.set_query(inbound.query());

    target
        .as_str()
        .parse::<Uri>()
        .map_err(|e| ForwardError::InvalidTarget {
            target: target.to_string(),
            reason: e.to_string(),
        })
}

/// The inbound request carries a body when it declares a positive length.
fn declares_body(headers: &header::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// The response sent when the upstream could not be reached.
pub fn bad_gateway(err: &ForwardError) -> Response<Body> {
    (
        StatusCode::BAD_GATEWAY,
        format!("Error forwarding request: {err}"),
    )
        .into_response()
}
