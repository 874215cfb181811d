//! Token provider client.
//!
//! One connection attempt fetches one short-lived credential authorizing
//! the identity to join its room. The credential is owned by the connection
//! state machine for the duration of that attempt and never persisted, so
//! this client is single-shot: no caching, no background refresh.
//!
//! # Security
//!
//! - The credential is returned as a `SecretString` (never logged)
//! - Rejection bodies are logged at trace level only
//! - HTTP timeouts prevent hanging connections

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::errors::TokenError;
use crate::identity::RoomIdentity;

/// Token request body sent to the provider.
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    room: &'a str,
    username: &'a str,
}

/// Token response body from the provider.
#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// HTTP client for the token provider endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TokenClient {
    /// Build a token client from the session configuration.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(config: &ClientConfig) -> Result<Self, TokenError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                TokenError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            endpoint: config.token_endpoint.clone(),
        })
    }

    /// Fetch a credential authorizing `identity` to join its room.
    ///
    /// # Errors
    ///
    /// - `TokenError::Http` - network error, timeout, or server error
    /// - `TokenError::Rejected` - provider returned a 4xx status
    /// - `TokenError::InvalidResponse` - body unparseable or token missing
    pub async fn fetch(&self, identity: &RoomIdentity) -> Result<SecretString, TokenError> {
        debug!(
            target: "vs.token",
            endpoint = %self.endpoint,
            room = %identity.room_name(),
            "Requesting room token"
        );

        let body = TokenRequest {
            room: identity.room_name(),
            username: identity.user_name(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!(target: "vs.token", error = %e, "HTTP request failed");
                TokenError::Http(e.to_string())
            })?;

        let status = response.status();

        if status.is_success() {
            let token_response: TokenResponse = response.json().await.map_err(|e| {
                warn!(target: "vs.token", error = %e, "Failed to parse token response");
                TokenError::InvalidResponse(e.to_string())
            })?;

            if token_response.token.is_empty() {
                warn!(target: "vs.token", "Provider returned an empty token");
                return Err(TokenError::InvalidResponse("empty token".to_string()));
            }

            debug!(target: "vs.token", "Room token acquired");
            Ok(SecretString::from(token_response.token))
        } else if status.is_client_error() {
            // Read the body for diagnostics, but only log it at trace level
            let body = response.text().await.unwrap_or_else(|e| {
                trace!(target: "vs.token", error = %e, "Failed to read rejection body");
                "<failed to read body>".to_string()
            });
            warn!(
                target: "vs.token",
                status = %status,
                "Token request rejected by provider"
            );
            trace!(target: "vs.token", body = %body, "Rejection response body");
            Err(TokenError::Rejected(format!("status {status}")))
        } else {
            warn!(
                target: "vs.token",
                status = %status,
                "Unexpected response from token provider"
            );
            Err(TokenError::Http(format!("unexpected status: {status}")))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> ClientConfig {
        ClientConfig::new(
            format!("{base_url}/api/get-token"),
            "ws://localhost:7880".to_string(),
        )
    }

    fn test_identity() -> RoomIdentity {
        RoomIdentity::new("room-1", "alice").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/get-token"))
            .and(body_json(serde_json::json!({
                "room": "room-1",
                "username": "alice"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "signed-room-token"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TokenClient::new(&test_config(&mock_server.uri())).unwrap();
        let credential = client.fetch(&test_identity()).await.unwrap();

        assert_eq!(credential.expose_secret(), "signed-room-token");
    }

    #[tokio::test]
    async fn test_fetch_rejected_on_4xx() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/get-token"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error":"bad identity"}"#),
            )
            .mount(&mock_server)
            .await;

        let client = TokenClient::new(&test_config(&mock_server.uri())).unwrap();
        let err = client.fetch(&test_identity()).await.unwrap_err();

        assert!(matches!(err, TokenError::Rejected(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_fetch_http_error_on_5xx() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/get-token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = TokenClient::new(&test_config(&mock_server.uri())).unwrap();
        let err = client.fetch(&test_identity()).await.unwrap_err();

        assert!(matches!(err, TokenError::Http(_)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_response_on_malformed_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/get-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not valid json"))
            .mount(&mock_server)
            .await;

        let client = TokenClient::new(&test_config(&mock_server.uri())).unwrap();
        let err = client.fetch(&test_identity()).await.unwrap_err();

        assert!(matches!(err, TokenError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_response_on_missing_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/get-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"other": true})),
            )
            .mount(&mock_server)
            .await;

        let client = TokenClient::new(&test_config(&mock_server.uri())).unwrap();
        let err = client.fetch(&test_identity()).await.unwrap_err();

        assert!(matches!(err, TokenError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_response_on_empty_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/get-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": ""})),
            )
            .mount(&mock_server)
            .await;

        let client = TokenClient::new(&test_config(&mock_server.uri())).unwrap();
        let err = client.fetch(&test_identity()).await.unwrap_err();

        assert!(matches!(err, TokenError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_fetch_http_error_on_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/get-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"token": "slow-token"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let config = test_config(&mock_server.uri()).with_http_timeout(Duration::from_millis(100));
        let client = TokenClient::new(&config).unwrap();
        let err = client.fetch(&test_identity()).await.unwrap_err();

        assert!(matches!(err, TokenError::Http(_)));
    }

    #[test]
    fn test_token_response_debug_redacts() {
        let response = TokenResponse {
            token: "super-secret-token".to_string(),
        };

        let debug_str = format!("{response:?}");
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("super-secret-token"));
    }
}
