//! Inbound header filtering.
//!
//! # Responsibilities
//! - Forward only content headers and platform headers (by name prefix)
//! - Drop credentials, cookies and hop-by-hop headers from the caller
//! - Guarantee `Content-Type: application/json` toward the backend
//!
//! # Design Decisions
//! - Allowlist, not denylist: anything unknown stays behind
//! - `Content-Length` is dropped; the client recomputes framing for the body it sends
//! - Content-Type is written last so it always wins

use axum::http::{header, HeaderMap, HeaderValue};

/// Prefix-based header allowlist.
#[derive(Debug, Clone)]
pub struct HeaderFilter {
    prefixes: Vec<String>,
}

impl HeaderFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    fn is_forwarded(&self, name: &header::HeaderName) -> bool {
        // HeaderName is always lowercase.
        let name = name.as_str();
        name != header::CONTENT_LENGTH.as_str()
            && self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Select the headers to send upstream.
    pub fn filter(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut forwarded = HeaderMap::new();
        for (name, value) in inbound {
            if self.is_forwarded(name) {
                forwarded.append(name.clone(), value.clone());
            }
        }
        forwarded.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        forwarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn telegram_filter() -> HeaderFilter {
        HeaderFilter::new(["content-", "x-telegram-"])
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_forwards_content_and_platform_headers_only() {
        let inbound = headers(&[
            ("Content-Type", "text/plain"),
            ("X-Telegram-Bot-Api-Secret-Token", "abc"),
            ("Authorization", "Bearer xyz"),
        ]);

        let forwarded = telegram_filter().filter(&inbound);

        assert_eq!(forwarded.len(), 2);
        assert_eq!(forwarded.get("content-type").unwrap(), "application/json");
        assert_eq!(
            forwarded.get("x-telegram-bot-api-secret-token").unwrap(),
            "abc"
        );
        assert!(forwarded.get("authorization").is_none());
    }

    #[test]
    fn test_content_type_is_injected_when_missing() {
        let forwarded = telegram_filter().filter(&HeaderMap::new());
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_drops_hop_by_hop_and_framing_headers() {
        let inbound = headers(&[
            ("Connection", "keep-alive"),
            ("Cookie", "session=1"),
            ("Host", "relay.example.com"),
            ("Content-Length", "42"),
            ("Content-Encoding", "gzip"),
        ]);

        let forwarded = telegram_filter().filter(&inbound);
        let names: Vec<_> = forwarded.keys().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"content-encoding"));
        assert!(names.contains(&"content-type"));
    }

    #[test]
    fn test_prefixes_are_case_insensitive() {
        let filter = HeaderFilter::new(["X-Platform-"]);
        let inbound = headers(&[("X-Platform-Signature", "sig")]);
        assert!(filter.filter(&inbound).contains_key("x-platform-signature"));
    }
}
