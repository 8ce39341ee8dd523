//! Server configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the HTTP server wrapped around the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to serve the `/info` listing endpoint.
    pub enable_info: bool,
    /// Whether to serve the `/_health` endpoint.
    pub enable_health: bool,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
    /// Take the client IP from the first `X-Forwarded-For` hop.
    pub trust_forwarded_for: bool,
    /// Seconds between sweeps of elapsed rate-limit windows.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_info: true,
            enable_health: true,
            max_body_size: 1024 * 1024, // 1MB
            trust_forwarded_for: false,
            sweep_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `FNSERVE_HOST` and `FNSERVE_PORT` when set.
    pub fn from_env() -> Result<Self, std::num::ParseIntError> {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("FNSERVE_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("FNSERVE_PORT") {
            config.port = port.parse()?;
        }
        Ok(config)
    }

    /// Set the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the maximum accepted body size.
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn enable_info(mut self, enable: bool) -> Self {
        self.enable_info = enable;
        self
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ServerConfig::new().host("0.0.0.0").port(9000).max_body_size(10);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.max_body_size, 10);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: ServerConfig = serde_json::from_str(r#"{ "port": 9001 }"#).unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.enable_info);
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }
}
