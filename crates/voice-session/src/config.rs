//! Client configuration.
//!
//! Two endpoints: the token provider (HTTP) and the media transport server
//! (WebSocket URL handed to the transport). Timeouts apply to the token
//! request only; the transport imposes its own.

use std::time::Duration;

use crate::errors::TokenError;

/// Default HTTP request timeout for the token provider.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for the HTTP client.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a voice session client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Token provider endpoint (e.g. `http://localhost:8001/api/get-token`).
    pub token_endpoint: String,

    /// Media transport server URL (e.g. `wss://voice.example.com`).
    pub server_url: String,

    /// HTTP request timeout for the token fetch.
    pub http_timeout: Duration,

    /// HTTP connection timeout for the token fetch.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a new configuration with default timeouts.
    ///
    /// # Security Warning
    ///
    /// Plain `http://`/`ws://` URLs send the credential in clear text. Use
    /// [`ClientConfig::new_secure`] to enforce encrypted endpoints.
    #[must_use]
    pub fn new(token_endpoint: String, server_url: String) -> Self {
        Self {
            token_endpoint,
            server_url,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Create a configuration requiring encrypted endpoints.
    ///
    /// This is the recommended constructor for production use.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` if the token endpoint is not
    /// `https://` or the server URL is not `wss://`.
    pub fn new_secure(token_endpoint: String, server_url: String) -> Result<Self, TokenError> {
        if !token_endpoint.starts_with("https://") {
            return Err(TokenError::Configuration(
                "token endpoint must use HTTPS in production".into(),
            ));
        }
        if !server_url.starts_with("wss://") {
            return Err(TokenError::Configuration(
                "server URL must use WSS in production".into(),
            ));
        }
        Ok(Self::new(token_endpoint, server_url))
    }

    /// Set the HTTP request timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the HTTP connection timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new(
            "http://localhost:8001/api/get-token".to_string(),
            "ws://localhost:7880".to_string(),
        );

        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new(
            "http://localhost:8001/api/get-token".to_string(),
            "ws://localhost:7880".to_string(),
        )
        .with_http_timeout(Duration::from_secs(3))
        .with_connect_timeout(Duration::from_secs(1));

        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_new_secure_requires_encrypted_endpoints() {
        let result = ClientConfig::new_secure(
            "https://api.example.com/get-token".to_string(),
            "wss://voice.example.com".to_string(),
        );
        assert!(result.is_ok());

        let result = ClientConfig::new_secure(
            "http://api.example.com/get-token".to_string(),
            "wss://voice.example.com".to_string(),
        );
        assert!(matches!(result, Err(TokenError::Configuration(_))));

        let result = ClientConfig::new_secure(
            "https://api.example.com/get-token".to_string(),
            "ws://voice.example.com".to_string(),
        );
        assert!(matches!(result, Err(TokenError::Configuration(_))));
    }
}
