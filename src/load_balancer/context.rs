//! Per-request routing context.
//!
//! # Responsibilities
//! - Expose peer address, forwarded address, path and affinity cookie
//! - Carry an affinity cookie back to the response writer
//!
//! # Design Decisions
//! - Built once per request from the inbound parts; strategies never touch
//!   the raw request
//! - Header parsing is lenient: unreadable values are treated as absent

use std::fmt;
use std::net::SocketAddr;
use std::time::SystemTime;

use axum::http::{header, HeaderMap, HeaderValue, Request};

/// Name of the session affinity cookie.
pub const AFFINITY_COOKIE: &str = "sticky";

/// Header carrying the originating client address when behind another proxy.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// What a strategy may know about the in-flight request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    peer: Option<SocketAddr>,
    forwarded_for: Option<String>,
    path: String,
    affinity: Option<String>,
    set_cookie: Option<AffinityCookie>,
}

impl RequestContext {
    /// Context for a bare path, with no client information.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Extract the routing-relevant parts of an inbound request.
    pub fn from_request<B>(request: &Request<B>, peer: Option<SocketAddr>) -> Self {
        let headers = request.headers();
        Self {
            peer,
            forwarded_for: first_forwarded_for(headers),
            path: request.uri().path().to_string(),
            affinity: cookie_value(headers, AFFINITY_COOKIE),
            set_cookie: None,
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn with_forwarded_for(mut self, addr: impl Into<String>) -> Self {
        self.forwarded_for = Some(addr.into());
        self
    }

    pub fn with_affinity(mut self, value: impl Into<String>) -> Self {
        self.affinity = Some(value.into());
        self
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn forwarded_for(&self) -> Option<&str> {
        self.forwarded_for.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Value of the affinity cookie sent by the client, if any.
    pub fn affinity(&self) -> Option<&str> {
        self.affinity.as_deref()
    }

    /// Ask the response writer to set the affinity cookie.
    pub fn set_affinity_cookie(&mut self, cookie: AffinityCookie) {
        self.set_cookie = Some(cookie);
    }

    pub fn pending_cookie(&self) -> Option<&AffinityCookie> {
        self.set_cookie.as_ref()
    }

    pub fn take_affinity_cookie(&mut self) -> Option<AffinityCookie> {
        self.set_cookie.take()
    }
}

/// An affinity cookie to be sent with the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinityCookie {
    pub value: String,
    pub expires: SystemTime,
}

impl AffinityCookie {
    pub fn new(value: impl Into<String>, expires: SystemTime) -> Self {
        Self {
            value: value.into(),
            expires,
        }
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.to_string()).ok()
    }
}

impl fmt::Display for AffinityCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}; expires={}; path=/; samesite=lax; httponly",
            AFFINITY_COOKIE,
            self.value,
            httpdate::fmt_http_date(self.expires)
        )
    }
}

fn first_forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v.trim_matches('"').to_string())
}
