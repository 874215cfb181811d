//! Session handle: ownership of one live room connection.
//!
//! Exactly one `SessionHandle` may be live per state-machine instance.
//! `close()` is the only operation; it is multi-call safe and runs every
//! release step even if an earlier one fails, so the microphone and the
//! transport connection are never leaked on abnormal paths.

use tracing::{debug, warn};

use crate::transport::RoomSession;

/// Owns the lifetime of one transport connection and its local audio
/// publication.
pub struct SessionHandle {
    room: Option<Box<dyn RoomSession>>,
}

impl SessionHandle {
    /// Wrap a freshly connected room.
    #[must_use]
    pub fn new(room: Box<dyn RoomSession>) -> Self {
        Self { room: Some(room) }
    }

    /// Whether the handle still owns a live connection.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.room.is_some()
    }

    /// Release the local audio publication and close the connection.
    ///
    /// Each release step is isolated: a failure is logged and the
    /// remaining steps still run. Calling `close` again is a no-op.
    pub async fn close(&mut self) {
        let Some(mut room) = self.room.take() else {
            return;
        };

        debug!(target: "vs.session", "Closing session");

        if let Err(e) = room.set_microphone_enabled(false).await {
            warn!(target: "vs.session", error = %e, "Failed to release microphone");
        }

        if let Err(e) = room.close().await {
            warn!(target: "vs.session", error = %e, "Failed to close transport connection");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::identity::RoomIdentity;
    use crate::transport::mock::MockTransport;
    use crate::transport::{MediaConstraints, MediaTransport};
    use secrecy::SecretString;
    use std::sync::atomic::Ordering;

    async fn connected_session(transport: &MockTransport) -> SessionHandle {
        let identity = RoomIdentity::new("room-1", "alice").unwrap();
        let connected = transport
            .connect(
                "ws://localhost:7880",
                &SecretString::from("token"),
                &identity,
                MediaConstraints::audio_only(),
            )
            .await
            .unwrap();
        SessionHandle::new(connected.room)
    }

    #[tokio::test]
    async fn test_close_releases_connection_once() {
        let transport = MockTransport::new();
        let state = transport.state();
        let mut session = connected_session(&transport).await;

        assert!(session.is_open());
        session.close().await;
        assert!(!session.is_open());
        assert_eq!(state.live_sessions.load(Ordering::SeqCst), 0);
        assert_eq!(state.close_calls.load(Ordering::SeqCst), 1);

        // Second close is a no-op
        session.close().await;
        assert_eq!(state.close_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_runs_all_steps_despite_microphone_failure() {
        let transport = MockTransport::new();
        transport.fail_next_microphone(TransportError::Audio("device busy".to_string()));
        let state = transport.state();
        let mut session = connected_session(&transport).await;

        // Microphone release fails, transport close still runs
        session.close().await;
        assert_eq!(state.live_sessions.load(Ordering::SeqCst), 0);
        assert_eq!(state.close_calls.load(Ordering::SeqCst), 1);
    }
}
