//! The end user behind a beacon.
//!
//! Keep one `Visitor` per user across requests (see `persist`), the same way
//! the browser keeps its `__utma` cookie.

use std::net::Ipv4Addr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};

use super::session::Session;
use crate::error::{Error, Result};
use crate::util::{generate_hash, random32};

/// Largest unique id the `__utma` cookie can carry.
pub const MAX_UNIQUE_ID: u32 = 0x7fff_ffff;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visitor {
    #[serde(default, deserialize_with = "deserialize_unique_id")]
    unique_id: Option<u32>,
    pub first_visit_time: DateTime<Utc>,
    pub previous_visit_time: DateTime<Utc>,
    pub current_visit_time: DateTime<Utc>,
    pub visit_count: u32,
    /// Sent as `X-Forwarded-For`.
    pub ip_address: Option<String>,
    /// Sent as `User-Agent`.
    pub user_agent: Option<String>,
    /// e.g. `de-DE`; lower-cased into `utmul`.
    pub locale: Option<String>,
    pub flash_version: Option<String>,
    pub java_enabled: Option<bool>,
    pub screen_color_depth: Option<u32>,
    /// e.g. `1024x768`.
    pub screen_resolution: Option<String>,
}

impl Default for Visitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor {
    /// A visitor without any previous visit information.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            unique_id: None,
            first_visit_time: now,
            previous_visit_time: now,
            current_visit_time: now,
            visit_count: 1,
            ip_address: None,
            user_agent: None,
            locale: None,
            flash_version: None,
            java_enabled: None,
            screen_color_depth: None,
            screen_resolution: None,
        }
    }

    /// Fill IP, user agent and locale from incoming request metadata.
    ///
    /// `headers` are matched case-insensitively. The address is taken from the
    /// last `X-Forwarded-For` hop, falling back to `remote_addr`; loopback and
    /// private IPv4 ranges are ignored.
    pub fn from_request_headers<'a, I>(remote_addr: Option<&str>, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut visitor = Self::new();
        let mut forwarded_for = None;

        for (name, value) in headers {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match name.to_ascii_lowercase().as_str() {
                "x-forwarded-for" => forwarded_for = Some(value),
                "user-agent" => visitor.user_agent = Some(value.to_string()),
                "accept-language" => visitor.locale = preferred_locale(value),
                _ => {}
            }
        }

        visitor.ip_address = [forwarded_for, remote_addr]
            .into_iter()
            .flatten()
            .find_map(public_ipv4);

        visitor
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_screen(mut self, resolution: impl Into<String>, color_depth: u32) -> Self {
        self.screen_resolution = Some(resolution.into());
        self.screen_color_depth = Some(color_depth);
        self
    }

    pub fn with_unique_id(mut self, value: u32) -> Result<Self> {
        self.set_unique_id(value)?;
        Ok(self)
    }

    /// Pin the unique id; must fit in 31 bits.
    pub fn set_unique_id(&mut self, value: u32) -> Result<()> {
        if value > MAX_UNIQUE_ID {
            return Err(Error::configuration(format!(
                "Visitor unique ID has to be a 32-bit integer between 0 and {}, got {}",
                MAX_UNIQUE_ID, value
            )));
        }
        self.unique_id = Some(value);
        Ok(())
    }

    /// Unique id, generated on first read from whatever user-specific
    /// properties are known at that point.
    pub fn unique_id(&mut self) -> u32 {
        match self.unique_id {
            Some(id) => id,
            None => {
                let id = self.generate_unique_id();
                self.unique_id = Some(id);
                id
            }
        }
    }

    /// Unique id if one was set or already generated.
    pub fn peek_unique_id(&self) -> Option<u32> {
        self.unique_id
    }

    fn generate_hash(&self) -> i32 {
        let mut fingerprint = String::new();
        fingerprint.push_str(self.user_agent.as_deref().unwrap_or(""));
        fingerprint.push_str(self.screen_resolution.as_deref().unwrap_or(""));
        if let Some(depth) = self.screen_color_depth {
            fingerprint.push_str(&depth.to_string());
        }
        generate_hash(&fingerprint)
    }

    fn generate_unique_id(&self) -> u32 {
        (random32() ^ self.generate_hash() as u32) & MAX_UNIQUE_ID
    }

    /// Account for a new session: roll the visit times and count the visit.
    /// Adding the session that started the current visit is a no-op.
    pub fn add_session(&mut self, session: &Session) {
        if session.start_time != self.current_visit_time {
            self.previous_visit_time = self.current_visit_time;
            self.current_visit_time = session.start_time;
            self.visit_count += 1;
        }
    }
}

/// Stored state gets the same 31-bit bound as `set_unique_id`.
fn deserialize_unique_id<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = Option::<u32>::deserialize(deserializer)?;
    match id {
        Some(v) if v > MAX_UNIQUE_ID => Err(de::Error::custom(format!(
            "unique_id {} exceeds {}",
            v, MAX_UNIQUE_ID
        ))),
        _ => Ok(id),
    }
}

fn public_ipv4(list: &str) -> Option<String> {
    let last = list.rsplit(',').next()?.trim();
    let ip: Ipv4Addr = last.parse().ok()?;
    if ip.is_loopback() || ip.is_private() {
        return None;
    }
    Some(ip.to_string())
}

fn accept_language_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:^|\s*,\s*)([a-zA-Z]{1,8}(?:-[a-zA-Z]{1,8})*)\s*(?:;\s*q\s*=\s*(1(?:\.0{0,3})?|0(?:\.[0-9]{0,3})?))?",
        )
        .expect("static Accept-Language pattern")
    })
}

/// Highest-weighted language range of an `Accept-Language` header.
fn preferred_locale(header: &str) -> Option<String> {
    let mut best: Option<(&str, f32)> = None;
    for caps in accept_language_re().captures_iter(header) {
        let Some(tag) = caps.get(1) else { continue };
        let q = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<f32>().ok())
            .unwrap_or(1.0);
        // First entry wins on equal weight
        if best.map_or(true, |(_, best_q)| q > best_q) {
            best = Some((tag.as_str(), q));
        }
    }
    best.map(|(tag, _)| tag.replace('_', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_visitor_defaults() {
        let v = Visitor::new();
        assert_eq!(v.visit_count, 1);
        assert_eq!(v.first_visit_time, v.previous_visit_time);
        assert!(v.peek_unique_id().is_none());
    }

    #[test]
    fn test_unique_id_lazy_and_stable() {
        let mut v = Visitor::new()
            .with_user_agent("TestAgent/1.0")
            .with_screen("1024x768", 24);
        let id = v.unique_id();
        assert!(id <= MAX_UNIQUE_ID);
        assert_eq!(v.unique_id(), id);
        assert_eq!(v.peek_unique_id(), Some(id));
    }

    #[test]
    fn test_unique_id_range() {
        let mut v = Visitor::new();
        assert!(v.set_unique_id(MAX_UNIQUE_ID).is_ok());
        let err = v.set_unique_id(MAX_UNIQUE_ID + 1).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        // Rejected value does not replace the old one
        assert_eq!(v.unique_id(), MAX_UNIQUE_ID);
    }

    #[test]
    fn test_from_request_headers() {
        let headers = [
            ("User-Agent", "Mozilla/5.0 Test"),
            ("X-Forwarded-For", "10.0.0.1, 203.0.113.9"),
            ("Accept-Language", "de;q=0.7, en-US, fr;q=0.9"),
        ];
        let v = Visitor::from_request_headers(Some("127.0.0.1"), headers);
        assert_eq!(v.user_agent.as_deref(), Some("Mozilla/5.0 Test"));
        assert_eq!(v.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(v.locale.as_deref(), Some("en-US"));
    }

    #[test]
    fn test_private_addresses_ignored() {
        let headers = [("x-forwarded-for", "192.168.1.20")];
        let v = Visitor::from_request_headers(Some("172.16.4.4"), headers);
        assert!(v.ip_address.is_none());

        let v = Visitor::from_request_headers(Some("198.51.100.7"), [("x-forwarded-for", "garbage")]);
        assert_eq!(v.ip_address.as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn test_preferred_locale_weights() {
        assert_eq!(preferred_locale("fr;q=0.2, ja;q=0.8").as_deref(), Some("ja"));
        assert_eq!(preferred_locale("pt-BR").as_deref(), Some("pt-BR"));
        assert_eq!(preferred_locale(";;;"), None);
    }

    #[test]
    fn test_add_session_rolls_visit() {
        let mut v = Visitor::new();
        let before = v.current_visit_time;
        let session = Session::new()
            .with_start_time(DateTime::from_timestamp(2_000_000_000, 0).unwrap());

        v.add_session(&session);
        assert_eq!(v.visit_count, 2);
        assert_eq!(v.previous_visit_time, before);
        assert_eq!(v.current_visit_time, session.start_time);

        // Same session again does not count twice
        v.add_session(&session);
        assert_eq!(v.visit_count, 2);
    }

    #[test]
    fn test_serde_keeps_unique_id() {
        let v = Visitor::new().with_unique_id(42).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: Visitor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.peek_unique_id(), Some(42));
        assert_eq!(back, v);
    }

    #[test]
    fn test_serde_rejects_out_of_range_unique_id() {
        let mut json = serde_json::to_value(Visitor::new()).unwrap();
        json["unique_id"] = serde_json::json!(u32::MAX);
        assert!(serde_json::from_value::<Visitor>(json.clone()).is_err());

        json["unique_id"] = serde_json::json!(MAX_UNIQUE_ID);
        let v: Visitor = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(v.peek_unique_id(), Some(MAX_UNIQUE_ID));

        json.as_object_mut().unwrap().remove("unique_id");
        let v: Visitor = serde_json::from_value(json).unwrap();
        assert_eq!(v.peek_unique_id(), None);
    }
}
