//! Media transport seams.
//!
//! The real-time media transport is an external collaborator. These traits
//! capture exactly what the connection state machine needs from it: open a
//! room connection with a credential, publish local audio, deliver events
//! over one channel, and close. The audio playback sink is a second seam so
//! the dispatcher's side effect (binding a subscribed audio track to local
//! playback) is testable without a sound device.

use secrecy::SecretString;
use tokio::sync::mpsc;

use crate::errors::TransportError;
use crate::events::{RoomEvent, TrackInfo};
use crate::identity::RoomIdentity;

/// Local media constraints for a room connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    /// Publish local audio.
    pub audio: bool,
    /// Publish local video.
    pub video: bool,
}

impl MediaConstraints {
    /// Audio-only constraints, the voice session default.
    #[must_use]
    pub fn audio_only() -> Self {
        Self {
            audio: true,
            video: false,
        }
    }
}

/// A live room connection plus its event stream.
///
/// The event channel closing is equivalent to a `Disconnected` event: the
/// transport is gone either way.
pub struct ConnectedRoom {
    /// Handle to the live connection.
    pub room: Box<dyn RoomSession>,
    /// Inbound events, FIFO in the order the transport observed them.
    pub events: mpsc::Receiver<RoomEvent>,
}

/// The media transport (enables mocking).
#[async_trait::async_trait]
pub trait MediaTransport: Send + Sync {
    /// Open a connection to a room.
    async fn connect(
        &self,
        server_url: &str,
        credential: &SecretString,
        identity: &RoomIdentity,
        constraints: MediaConstraints,
    ) -> Result<ConnectedRoom, TransportError>;
}

/// One live connection to a room.
#[async_trait::async_trait]
pub trait RoomSession: Send {
    /// Enable or disable local audio publication.
    async fn set_microphone_enabled(&mut self, enabled: bool) -> Result<(), TransportError>;

    /// Close the connection and release transport resources.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Local audio playback backend (enables mocking).
pub trait AudioOutput: Send + Sync {
    /// Bind a subscribed audio track to a local playback sink.
    fn open_sink(&self, track: &TrackInfo) -> Result<Box<dyn PlaybackSink>, TransportError>;
}

/// A live playback binding for one subscribed audio track.
pub trait PlaybackSink: Send {
    /// Stop playback and release the sink.
    fn stop(&mut self);
}

/// Mock transport and audio implementations for testing.
///
/// Scripted outcomes, test-visible event injection, and counters for the
/// resource-discipline assertions (live sessions, close calls, sink
/// releases).
pub mod mock {
    use super::*;

    use secrecy::ExposeSecret;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Buffer size for injected events.
    const MOCK_EVENT_BUFFER: usize = 64;

    /// Shared observation state for one mock transport.
    #[derive(Default)]
    pub struct MockState {
        /// Number of `connect` calls made.
        pub connect_calls: AtomicUsize,
        /// Number of sessions currently open (connected, not yet closed).
        pub live_sessions: AtomicUsize,
        /// Number of `close` calls that actually released a session.
        pub close_calls: AtomicUsize,
        /// Whether the microphone is currently enabled.
        pub microphone_enabled: AtomicBool,
        /// Credential passed to the most recent `connect`.
        pub last_credential: Mutex<Option<String>>,
        /// Sender for injecting events into the most recent session.
        event_tx: Mutex<Option<mpsc::Sender<RoomEvent>>>,
    }

    impl MockState {
        /// Inject an event into the current session's stream.
        ///
        /// Returns `false` if there is no live session or the receiver has
        /// been dropped.
        pub async fn send_event(&self, event: RoomEvent) -> bool {
            let sender = {
                let guard = match self.event_tx.lock() {
                    Ok(guard) => guard,
                    Err(_) => return false,
                };
                guard.clone()
            };
            match sender {
                Some(tx) => tx.send(event).await.is_ok(),
                None => false,
            }
        }

        /// Drop the event sender, closing the stream as a transport-side
        /// disconnect would.
        pub fn drop_event_sender(&self) {
            if let Ok(mut guard) = self.event_tx.lock() {
                *guard = None;
            }
        }
    }

    /// Mock media transport with scripted outcomes.
    pub struct MockTransport {
        state: Arc<MockState>,
        connect_failures: Mutex<VecDeque<TransportError>>,
        microphone_failures: Mutex<VecDeque<TransportError>>,
    }

    impl MockTransport {
        /// Create a mock transport whose connects all succeed.
        #[must_use]
        pub fn new() -> Self {
            Self {
                state: Arc::new(MockState::default()),
                connect_failures: Mutex::new(VecDeque::new()),
                microphone_failures: Mutex::new(VecDeque::new()),
            }
        }

        /// Shared observation state.
        #[must_use]
        pub fn state(&self) -> Arc<MockState> {
            Arc::clone(&self.state)
        }

        /// Queue a failure for the next `connect` call.
        pub fn fail_next_connect(&self, error: TransportError) {
            if let Ok(mut queue) = self.connect_failures.lock() {
                queue.push_back(error);
            }
        }

        /// Queue a failure for the next microphone enable/disable call.
        pub fn fail_next_microphone(&self, error: TransportError) {
            if let Ok(mut queue) = self.microphone_failures.lock() {
                queue.push_back(error);
            }
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait::async_trait]
    impl MediaTransport for MockTransport {
        async fn connect(
            &self,
            _server_url: &str,
            credential: &SecretString,
            _identity: &RoomIdentity,
            _constraints: MediaConstraints,
        ) -> Result<ConnectedRoom, TransportError> {
            self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut guard) = self.state.last_credential.lock() {
                *guard = Some(credential.expose_secret().to_string());
            }

            let scripted = self
                .connect_failures
                .lock()
                .ok()
                .and_then(|mut queue| queue.pop_front());
            if let Some(error) = scripted {
                return Err(error);
            }

            let (tx, rx) = mpsc::channel(MOCK_EVENT_BUFFER);
            if let Ok(mut guard) = self.state.event_tx.lock() {
                *guard = Some(tx);
            }
            self.state.live_sessions.fetch_add(1, Ordering::SeqCst);

            let microphone_failures = self
                .microphone_failures
                .lock()
                .map(|mut queue| queue.drain(..).collect())
                .unwrap_or_default();

            Ok(ConnectedRoom {
                room: Box::new(MockRoom {
                    state: Arc::clone(&self.state),
                    microphone_failures,
                    closed: false,
                }),
                events: rx,
            })
        }
    }

    /// Mock room session backing a [`MockTransport`] connect.
    pub struct MockRoom {
        state: Arc<MockState>,
        microphone_failures: VecDeque<TransportError>,
        closed: bool,
    }

    #[async_trait::async_trait]
    impl RoomSession for MockRoom {
        async fn set_microphone_enabled(&mut self, enabled: bool) -> Result<(), TransportError> {
            if let Some(error) = self.microphone_failures.pop_front() {
                return Err(error);
            }
            self.state
                .microphone_enabled
                .store(enabled, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            if self.closed {
                return Ok(());
            }
            self.closed = true;
            self.state.microphone_enabled.store(false, Ordering::SeqCst);
            self.state.live_sessions.fetch_sub(1, Ordering::SeqCst);
            self.state.close_calls.fetch_add(1, Ordering::SeqCst);
            self.state.drop_event_sender();
            Ok(())
        }
    }

    /// Audio backend that records sink opens and releases.
    #[derive(Default)]
    pub struct RecordingAudioOutput {
        /// Tracks for which a sink was opened, in order.
        pub opened: Mutex<Vec<TrackInfo>>,
        /// Number of sinks stopped so far.
        pub stopped: Arc<AtomicUsize>,
        /// When set, `open_sink` fails with this error.
        pub fail_open: Mutex<Option<TransportError>>,
    }

    impl RecordingAudioOutput {
        /// Number of sinks opened so far.
        #[must_use]
        pub fn opened_count(&self) -> usize {
            self.opened.lock().map(|v| v.len()).unwrap_or(0)
        }

        /// Number of sinks stopped so far.
        #[must_use]
        pub fn stopped_count(&self) -> usize {
            self.stopped.load(Ordering::SeqCst)
        }
    }

    impl AudioOutput for RecordingAudioOutput {
        fn open_sink(&self, track: &TrackInfo) -> Result<Box<dyn PlaybackSink>, TransportError> {
            if let Some(error) = self.fail_open.lock().ok().and_then(|mut g| g.take()) {
                return Err(error);
            }
            if let Ok(mut opened) = self.opened.lock() {
                opened.push(track.clone());
            }
            Ok(Box::new(RecordingSink {
                stopped: Arc::clone(&self.stopped),
                released: false,
            }))
        }
    }

    /// Sink that counts its own release.
    pub struct RecordingSink {
        stopped: Arc<AtomicUsize>,
        released: bool,
    }

    impl PlaybackSink for RecordingSink {
        fn stop(&mut self) {
            if !self.released {
                self.released = true;
                self.stopped.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
