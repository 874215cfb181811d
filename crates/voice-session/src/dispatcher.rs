//! Event dispatcher: room events in, message log entries out.
//!
//! Five inbound event kinds normalize into the single message log. The one
//! side effect that is not pure logging is binding a subscribed audio track
//! to a local playback sink, undone on unsubscribe and on session teardown.
//!
//! `Disconnected` is deliberately not handled here; the connection state
//! machine owns liveness.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::events::{
    decode_data_message, DataMessage, MessageLogEntry, RoomEvent, TrackInfo, TrackKind,
    ASSISTANT_SENDER,
};
use crate::transport::{AudioOutput, PlaybackSink};

/// Key for a live playback sink: publishing participant plus track kind.
type SinkKey = (String, TrackKind);

/// Normalizes inbound room events and owns the live playback sinks.
pub struct EventDispatcher {
    audio: Arc<dyn AudioOutput>,
    sinks: HashMap<SinkKey, Box<dyn PlaybackSink>>,
}

impl EventDispatcher {
    /// Create a dispatcher for one session.
    #[must_use]
    pub fn new(audio: Arc<dyn AudioOutput>) -> Self {
        Self {
            audio,
            sinks: HashMap::new(),
        }
    }

    /// Number of live playback sinks.
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Ingest one event, returning the log entry it produces, if any.
    ///
    /// Track subscribe/unsubscribe produce no entries; they only bind and
    /// release playback. Malformed or unrecognized data payloads are
    /// dropped silently.
    pub fn ingest(&mut self, event: RoomEvent) -> Option<MessageLogEntry> {
        match event {
            RoomEvent::ParticipantConnected { identity } => {
                debug!(target: "vs.dispatcher", participant = %identity, "Participant joined");
                Some(MessageLogEntry::system(format!(
                    "{identity} joined the room."
                )))
            }

            RoomEvent::ParticipantDisconnected { identity } => {
                debug!(target: "vs.dispatcher", participant = %identity, "Participant left");
                Some(MessageLogEntry::system(format!("{identity} left the room.")))
            }

            RoomEvent::TrackSubscribed { track } => {
                self.bind_playback(&track);
                None
            }

            RoomEvent::TrackUnsubscribed { track } => {
                self.release_playback(&track);
                None
            }

            RoomEvent::DataReceived {
                payload,
                participant,
            } => match decode_data_message(&payload) {
                Some(DataMessage::Chat { message }) => {
                    let sender = participant.unwrap_or_else(|| ASSISTANT_SENDER.to_string());
                    Some(MessageLogEntry::remote(sender, message))
                }
                None => None,
            },

            RoomEvent::Disconnected { .. } => {
                trace!(target: "vs.dispatcher", "Ignoring disconnect event");
                None
            }
        }
    }

    /// Stop and release every live playback sink.
    ///
    /// Safe to call multiple times; part of session teardown.
    pub fn release_all(&mut self) {
        for (_, mut sink) in self.sinks.drain() {
            sink.stop();
        }
    }

    fn bind_playback(&mut self, track: &TrackInfo) {
        if track.kind != TrackKind::Audio {
            trace!(
                target: "vs.dispatcher",
                sid = %track.sid,
                kind = ?track.kind,
                "Ignoring non-audio track subscription"
            );
            return;
        }

        match self.audio.open_sink(track) {
            Ok(sink) => {
                debug!(
                    target: "vs.dispatcher",
                    sid = %track.sid,
                    participant = %track.participant,
                    "Audio playback bound"
                );
                if let Some(mut previous) = self
                    .sinks
                    .insert((track.participant.clone(), track.kind), sink)
                {
                    // Re-subscription for the same key; release the stale sink
                    previous.stop();
                }
            }
            Err(e) => {
                // Playback failure is local-only; the session stays up
                warn!(
                    target: "vs.dispatcher",
                    sid = %track.sid,
                    error = %e,
                    "Failed to bind audio playback"
                );
            }
        }
    }

    fn release_playback(&mut self, track: &TrackInfo) {
        match self.sinks.remove(&(track.participant.clone(), track.kind)) {
            Some(mut sink) => {
                debug!(
                    target: "vs.dispatcher",
                    sid = %track.sid,
                    participant = %track.participant,
                    "Audio playback released"
                );
                sink.stop();
            }
            None => {
                // Unsubscribe without a matching sink is not an error
                trace!(
                    target: "vs.dispatcher",
                    sid = %track.sid,
                    "No playback sink for unsubscribed track"
                );
            }
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.release_all();
    }
}
