//! Tracker and transport settings.
//!
//! Does not need to be consistent across requests; none of these settings
//! change what gets counted, only where and how beacons are sent.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint_host: String,
    pub endpoint_port: u16,
    pub endpoint_path: String,
    /// Connect/read timeout in seconds (fractions allowed).
    pub request_timeout: f64,
    /// Write the request and close without reading the response.
    pub fire_and_forget: bool,
    /// Queue beacons and send them when the tracker is dropped.
    pub send_on_shutdown: bool,
    /// Ask the collector to drop the last IP octet (`aip=1`).
    pub anonymize_ip_addresses: bool,
    /// Hash the domain name into the cookies; `false` sends `1` instead.
    pub allow_hash: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_host: "www.google-analytics.com".to_string(),
            endpoint_port: 80,
            endpoint_path: "/__utm.gif".to_string(),
            request_timeout: 1.0,
            fire_and_forget: false,
            send_on_shutdown: false,
            anonymize_ip_addresses: false,
            allow_hash: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Point at a collector by URL, e.g. `http://collector.internal:8080/__utm.gif`.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| Error::configuration(format!("Invalid endpoint {:?}: {}", endpoint, e)))?;
        if url.scheme() != "http" {
            return Err(Error::configuration(format!(
                "Endpoint {:?} must use plain http",
                endpoint
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| Error::configuration(format!("Endpoint {:?} has no host", endpoint)))?;

        self.endpoint_host = host.to_string();
        self.endpoint_port = url.port_or_known_default().unwrap_or(80);
        self.endpoint_path = url.path().to_string();
        Ok(self)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout.as_secs_f64();
        self
    }

    pub fn with_fire_and_forget(mut self, enabled: bool) -> Self {
        self.fire_and_forget = enabled;
        self
    }

    pub fn with_send_on_shutdown(mut self, enabled: bool) -> Self {
        self.send_on_shutdown = enabled;
        self
    }

    pub fn with_anonymize_ip_addresses(mut self, enabled: bool) -> Self {
        self.anonymize_ip_addresses = enabled;
        self
    }

    pub fn with_allow_hash(mut self, enabled: bool) -> Self {
        self.allow_hash = enabled;
        self
    }

    /// Timeout as a `Duration`; negative or NaN values mean "no wait".
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_timeout).unwrap_or(Duration::ZERO)
    }

    /// `http://host:port/path`, for display and logging.
    pub fn endpoint_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.endpoint_host, self.endpoint_port, self.endpoint_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.endpoint_host, "www.google-analytics.com");
        assert_eq!(c.endpoint_path, "/__utm.gif");
        assert_eq!(c.timeout(), Duration::from_secs(1));
        assert!(c.allow_hash);
        assert!(!c.anonymize_ip_addresses);
    }

    #[test]
    fn test_with_endpoint() {
        let c = Config::new()
            .with_endpoint("http://collector.internal:8080/t/__utm.gif")
            .unwrap();
        assert_eq!(c.endpoint_host, "collector.internal");
        assert_eq!(c.endpoint_port, 8080);
        assert_eq!(c.endpoint_path, "/t/__utm.gif");
        assert_eq!(c.endpoint_url(), "http://collector.internal:8080/t/__utm.gif");

        assert!(matches!(
            Config::new().with_endpoint("/relative"),
            Err(Error::Configuration(_))
        ));
        assert!(Config::new().with_endpoint("https://secure.example/x").is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let c = Config::from_json(r#"{"anonymize_ip_addresses": true, "request_timeout": 0.25}"#)
            .unwrap();
        assert!(c.anonymize_ip_addresses);
        assert_eq!(c.timeout(), Duration::from_millis(250));
        assert_eq!(c.endpoint_port, 80);
    }

    #[test]
    fn test_negative_timeout() {
        let c = Config {
            request_timeout: -3.0,
            ..Config::default()
        };
        assert_eq!(c.timeout(), Duration::ZERO);
    }
}
