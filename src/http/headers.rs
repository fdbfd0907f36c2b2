//! Header classification for forwarding.
//!
//! Headers fall into three tiers:
//! - message headers travel on the request/response head as-is
//! - content headers describe the body and travel with it
//! - transport headers manage a single connection and are never forwarded

use axum::http::header::{self, HeaderMap, HeaderName};

/// Which part of a forwarded message a header belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTier {
    Message,
    Content,
    Transport,
}

const CONTENT_HEADERS: &[&str] = &[
    "allow",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-length",
    "content-location",
    "content-md5",
    "content-range",
    "content-type",
    "expires",
    "last-modified",
];

const TRANSPORT_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Tier of a header by name alone.
pub fn classify(name: &HeaderName) -> HeaderTier {
    let name = name.as_str();
    if TRANSPORT_HEADERS.contains(&name) {
        HeaderTier::Transport
    } else if CONTENT_HEADERS.contains(&name) {
        HeaderTier::Content
    } else {
        HeaderTier::Message
    }
}

/// Headers of one message, split by tier. Transport headers, including any
/// named in `Connection`, are dropped.
#[derive(Debug, Default)]
pub struct SplitHeaders {
    pub message: HeaderMap,
    pub content: HeaderMap,
}

impl SplitHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let listed = connection_listed(headers);
        let mut split = Self::default();

        for (name, value) in headers {
            if listed.contains(name) {
                continue;
            }
            match classify(name) {
                HeaderTier::Message => split.message.append(name.clone(), value.clone()),
                HeaderTier::Content => split.content.append(name.clone(), value.clone()),
                HeaderTier::Transport => continue,
            };
        }
        split
    }

    /// Both forwardable tiers, message headers first.
    pub fn into_all(self) -> HeaderMap {
        let mut all = self.message;
        for (name, value) in &self.content {
            all.append(name.clone(), value.clone());
        }
        all
    }
}

/// Header names a sender declared hop-by-hop through `Connection`.
fn connection_listed(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_classify() {
        assert_eq!(classify(&header::CONTENT_TYPE), HeaderTier::Content);
        assert_eq!(classify(&header::CONTENT_LENGTH), HeaderTier::Content);
        assert_eq!(classify(&header::TRANSFER_ENCODING), HeaderTier::Transport);
        assert_eq!(classify(&header::ACCEPT), HeaderTier::Message);
        assert_eq!(
            classify(&HeaderName::from_static("x-custom")),
            HeaderTier::Message
        );
    }

    #[test]
    fn test_split_keeps_multi_values_and_drops_transport() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("one"));
        headers.append("x-tag", HeaderValue::from_static("two"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-secret"));
        headers.insert("x-secret", HeaderValue::from_static("hop"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let split = SplitHeaders::from_headers(&headers);
        let tags: Vec<_> = split.message.get_all("x-tag").iter().collect();
        assert_eq!(tags, vec!["one", "two"]);
        assert!(split.message.get("x-secret").is_none());
        assert!(split.message.get(header::CONNECTION).is_none());
        assert!(split.content.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(split.content.get(header::CONTENT_TYPE).unwrap(), "text/plain");

        let all = split.into_all();
        assert_eq!(all.len(), 3);
    }
}
