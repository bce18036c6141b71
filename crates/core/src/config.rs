//! Client configuration
//!
//! Settings that shape how requests are addressed and how failures are
//! reported. The library never reads a configuration file; callers build a
//! [`ClientConfig`] directly or deserialize it from their own config.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Domain the storage group hosts live under
const DEFAULT_DOMAIN: &str = "akamaihd.net";

/// Scheme used to reach the usage API
const DEFAULT_SCHEME: &str = "http";

/// Bytes of an error response body kept in the error message
const DEFAULT_ERROR_BODY_LIMIT: usize = 50;

/// Timeouts applied to the HTTP transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Whole-request timeout in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_ms: u64,
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    30000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            read_ms: default_read_timeout(),
        }
    }
}

/// Configuration for a NetStorage client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Domain appended to `{storage_group}-nsu.`
    #[serde(default = "default_domain")]
    pub domain: String,

    /// URL scheme, "http" or "https"
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Fixed base URL replacing `{scheme}://{host}`, e.g. for a proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Maximum bytes of an error body kept in [`Error::Status`]
    #[serde(default = "default_error_body_limit")]
    pub error_body_limit: usize,

    /// User-Agent header sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Transport timeouts; none are enforced when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

fn default_error_body_limit() -> usize {
    DEFAULT_ERROR_BODY_LIMIT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            scheme: default_scheme(),
            endpoint: None,
            error_body_limit: default_error_body_limit(),
            user_agent: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Send every request to a fixed base URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Check the settings that cannot be fixed up later
    pub fn validate(&self) -> Result<()> {
        if self.scheme != "http" && self.scheme != "https" {
            return Err(Error::Config(format!(
                "Unsupported scheme '{}', expected http or https",
                self.scheme
            )));
        }
        if self.domain.is_empty() && self.endpoint.is_none() {
            return Err(Error::Config("Domain must not be empty".into()));
        }
        Ok(())
    }

    /// Base URL for a storage group host
    pub fn base_url(&self, host: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("{}://{}", self.scheme, host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.domain, "akamaihd.net");
        assert_eq!(config.scheme, "http");
        assert_eq!(config.error_body_limit, 50);
        assert!(config.endpoint.is_none());
        assert!(config.timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"scheme": "https", "timeout": {"connect_ms": 100}}"#).unwrap();
        assert_eq!(config.scheme, "https");
        assert_eq!(config.domain, "akamaihd.net");
        let timeout = config.timeout.unwrap();
        assert_eq!(timeout.connect_ms, 100);
        assert_eq!(timeout.read_ms, 30000);
    }

    #[test]
    fn test_invalid_scheme() {
        let config = ClientConfig {
            scheme: "ftp".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported scheme"));
    }

    #[test]
    fn test_base_url() {
        let config = ClientConfig::default();
        assert_eq!(
            config.base_url("grp-nsu.akamaihd.net"),
            "http://grp-nsu.akamaihd.net"
        );

        let config = ClientConfig::default().with_endpoint("http://127.0.0.1:8080/");
        assert_eq!(config.base_url("ignored"), "http://127.0.0.1:8080");
    }
}
