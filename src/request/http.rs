//! The finished beacon: an HTTP/1.0 GET request, byte for byte.
//!
//! ```text
//! GET /__utm.gif?<query> HTTP/1.0\r\n
//! Host: <endpoint host>\r\n
//! User-Agent: <visitor user agent>\r\n
//! X-Forwarded-For: <visitor ip>\r\n
//! Connection: close\r\n
//! \r\n\r\n
//! ```

use std::fmt;

use super::BeaconKind;
use crate::config::Config;

/// A rendered beacon, ready for a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: BeaconKind,
    pub host: String,
    pub port: u16,
    /// Rendered query string, without the leading `?`.
    pub query: String,
    bytes: Vec<u8>,
}

impl Request {
    pub(crate) fn render(
        kind: BeaconKind,
        config: &Config,
        query: String,
        user_agent: Option<&str>,
        forwarded_for: Option<&str>,
    ) -> Self {
        let mut r = String::with_capacity(query.len() + 256);
        r.push_str("GET ");
        r.push_str(&config.endpoint_path);
        r.push('?');
        r.push_str(&query);
        r.push_str(" HTTP/1.0\r\n");
        r.push_str("Host: ");
        r.push_str(&config.endpoint_host);
        r.push_str("\r\n");
        r.push_str("User-Agent: ");
        push_header_value(&mut r, user_agent.unwrap_or(""));
        r.push_str("\r\n");
        // Collectors have historically ignored this header; sent for correctness.
        r.push_str("X-Forwarded-For: ");
        push_header_value(&mut r, forwarded_for.unwrap_or(""));
        r.push_str("\r\n");
        r.push_str("Connection: close\r\n");
        r.push_str("\r\n\r\n");

        Self {
            kind,
            host: config.endpoint_host.clone(),
            port: config.endpoint_port,
            query,
            bytes: r.into_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Value of one query parameter, still percent-encoded.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == key).then_some(v)
        })
    }
}

/// Header values come from visitor input; line breaks would start new headers.
fn push_header_value(out: &mut String, value: &str) {
    out.extend(value.chars().filter(|c| !matches!(c, '\r' | '\n')));
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}
