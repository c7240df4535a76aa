//! Forwarding to the upstream image service.
//!
//! # Responsibilities
//! - Build the upstream URI from the effective path and original query
//! - Strip hop-by-hop headers in both directions
//!
//! # Design Decisions
//! - Bodies are streamed, never buffered
//! - End-to-end headers, including `x-request-id`, pass through unchanged

use axum::http::{header, uri::InvalidUri, HeaderMap, HeaderName, Uri};

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "upgrade",
];

/// Build `http://<upstream><path>[?query]`.
pub fn upstream_uri(upstream: &str, path: &str, query: Option<&str>) -> Result<Uri, InvalidUri> {
    let uri = match query {
        Some(q) => format!("http://{}{}?{}", upstream, path, q),
        None => format!("http://{}{}", upstream, path),
    };
    uri.parse()
}

/// Remove headers that only apply to a single connection.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in &named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_upstream_uri_keeps_escaping() {
        let uri = upstream_uri("127.0.0.1:8888", "/sig/300x300/http%3A/example.com%2Fa.png", None).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:8888/sig/300x300/http%3A/example.com%2Fa.png");

        let uri = upstream_uri("thumbor:8888", "/unsafe/a.png", Some("v=1")).unwrap();
        assert_eq!(uri.path_and_query().unwrap().as_str(), "/unsafe/a.png?v=1");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-internal"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-internal", HeaderValue::from_static("1"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("image/webp"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 2);
        assert!(headers.contains_key("x-request-id"));
        assert!(headers.contains_key(header::ACCEPT));
    }
}
