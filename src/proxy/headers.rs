//! Header handling for replays and for the relayed response.
//!
//! [`build_replay_headers`] gives each replay its own copy of the
//! inbound headers with hop-by-hop headers stripped and `Host` pointed
//! at the destination. [`strip_response_hop_by_hop`] prepares captured
//! response headers for the relay.

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Strip hop-by-hop headers and `content-length` from a captured response.
///
/// The body has already been fully collected, so the origin's framing
/// headers no longer describe what the relay sends. Axum sets the
/// correct `content-length` from the actual body bytes.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove(hyper::header::CONTENT_LENGTH);
}

pub fn build_replay_headers(
    original: &HeaderMap,
    target_url: &url::Url,
    strip_hop_by_hop: bool,
) -> HeaderMap {
    let mut headers = original.clone();

    if strip_hop_by_hop {
        for header_name in HOP_BY_HOP.iter() {
            headers.remove(header_name);
        }
    }

    // The body is replayed from a buffer; hyper frames it from its exact size.
    headers.remove(hyper::header::CONTENT_LENGTH);

    if let Some(host) = target_url.host_str() {
        let host_value = target_url
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        if let Ok(val) = HeaderValue::from_str(&host_value) {
            headers.insert(hyper::header::HOST, val);
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> url::Url {
        url::Url::parse(url).unwrap()
    }

    #[test]
    fn strips_hop_by_hop() {
        let mut original = HeaderMap::new();
        original.insert("connection", "keep-alive".parse().unwrap());
        original.insert("content-type", "application/json".parse().unwrap());

        let result = build_replay_headers(&original, &target("http://target:8080"), true);

        assert!(result.get("connection").is_none());
        assert_eq!(result.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn keeps_hop_by_hop_when_disabled() {
        let mut original = HeaderMap::new();
        original.insert("upgrade", "h2c".parse().unwrap());

        let result = build_replay_headers(&original, &target("http://target:8080"), false);
        assert_eq!(result.get("upgrade").unwrap(), "h2c");
    }

    #[test]
    fn rewrites_host() {
        let mut original = HeaderMap::new();
        original.insert("host", "gateway.local".parse().unwrap());

        let result = build_replay_headers(&original, &target("http://backend:9090/path"), true);
        assert_eq!(result.get("host").unwrap(), "backend:9090");

        let result = build_replay_headers(&original, &target("https://backend/path"), true);
        assert_eq!(result.get("host").unwrap(), "backend");
    }

    #[test]
    fn repeated_headers_survive() {
        let mut original = HeaderMap::new();
        original.append("x-tag", "a".parse().unwrap());
        original.append("x-tag", "b".parse().unwrap());

        let result = build_replay_headers(&original, &target("http://t"), true);
        assert_eq!(result.get_all("x-tag").iter().count(), 2);
    }

    #[test]
    fn response_framing_headers_are_removed() {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", "chunked".parse().unwrap());
        headers.insert("content-length", "42".parse().unwrap());
        headers.insert("x-backend", "a".parse().unwrap());

        strip_response_hop_by_hop(&mut headers);

        assert!(headers.get("transfer-encoding").is_none());
        assert!(headers.get("content-length").is_none());
        assert_eq!(headers.get("x-backend").unwrap(), "a");
    }
}
