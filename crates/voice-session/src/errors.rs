//! Voice session error types.
//!
//! Connect-path failures are recoverable: they return the state machine to
//! `Disconnected` and surface a short human-readable message through the UI
//! state. Internal detail is logged but not exposed to the end user.
//!
//! Malformed inbound data payloads are deliberately NOT represented here;
//! they are dropped at the dispatcher with a diagnostic trace.

use thiserror::Error;

/// Errors from the token provider (credential acquisition).
#[derive(Error, Debug, Clone)]
pub enum TokenError {
    /// HTTP request failed (network error, timeout, server error).
    #[error("Token request failed: {0}")]
    Http(String),

    /// Provider rejected the request (4xx status).
    #[error("Token request rejected: {0}")]
    Rejected(String),

    /// Response body could not be parsed or is missing the token.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Client-side configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors from the media transport.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Room connection handshake failed.
    #[error("Transport connect failed: {0}")]
    Connect(String),

    /// Local audio publication (microphone) failed.
    #[error("Audio error: {0}")]
    Audio(String),

    /// Playback sink could not be opened or released.
    #[error("Playback error: {0}")]
    Playback(String),

    /// Transport connection closed or otherwise unusable.
    #[error("Transport closed: {0}")]
    Closed(String),
}

/// Top-level client error surfaced by the connection state machine.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// Credential acquisition failed; no transport connection was attempted.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Transport connection, audio publication, or mid-session failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The session actor has stopped and can no longer accept commands.
    #[error("Session actor stopped")]
    Stopped,
}

impl ClientError {
    /// Returns the short message surfaced through the UI-facing state.
    ///
    /// Provider and transport internals (endpoints, status bodies) stay in
    /// the logs; the UI gets a stable, human-readable summary.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            ClientError::Token(TokenError::Rejected(_)) => {
                "Voice chat access was denied".to_string()
            }
            ClientError::Token(_) => "Failed to get voice chat token".to_string(),
            ClientError::Transport(_) => "Failed to connect to voice chat".to_string(),
            ClientError::Stopped => "Voice chat is unavailable".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", TokenError::Http("connection refused".to_string())),
            "Token request failed: connection refused"
        );
        assert_eq!(
            format!("{}", TransportError::Connect("handshake timeout".to_string())),
            "Transport connect failed: handshake timeout"
        );
        assert_eq!(
            format!(
                "{}",
                ClientError::Token(TokenError::Rejected("status 401".to_string()))
            ),
            "Token error: Token request rejected: status 401"
        );
    }

    #[test]
    fn test_token_error_conversion() {
        let err: ClientError = TokenError::Http("timeout".to_string()).into();
        assert!(matches!(err, ClientError::Token(_)));
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: ClientError = TransportError::Audio("no device".to_string()).into();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[test]
    fn test_client_messages_hide_internal_details() {
        let err = ClientError::Token(TokenError::Http(
            "connect error to 10.0.0.7:8001".to_string(),
        ));
        assert!(!err.client_message().contains("10.0.0.7"));
        assert_eq!(err.client_message(), "Failed to get voice chat token");

        let err = ClientError::Transport(TransportError::Connect(
            "wss://voice.internal refused".to_string(),
        ));
        assert!(!err.client_message().contains("voice.internal"));
        assert_eq!(err.client_message(), "Failed to connect to voice chat");
    }

    #[test]
    fn test_rejection_has_distinct_client_message() {
        let err = ClientError::Token(TokenError::Rejected("status 403".to_string()));
        assert_eq!(err.client_message(), "Voice chat access was denied");
    }
}
