//! Client-side lifecycle management for real-time voice sessions.
//!
//! A session connects a local user to a named room on a real-time media
//! transport, publishes the local microphone, plays back remote audio, and
//! folds transport events into an append-only message log for presentation.
//! All state lives in a single actor task ([`SessionActor`]) driven through
//! a cloneable handle ([`VoiceClient`]).

#![warn(clippy::pedantic)]

/// Module for the connection state machine actor and its client handle
pub mod client;

/// Module for session configuration
pub mod config;

/// Module for normalizing room events into the message log
pub mod dispatcher;

/// Module for error types
pub mod errors;

/// Module for room events, data messages, and the message log
pub mod events;

/// Module for room and user identity
pub mod identity;

/// Module for live session resource ownership
pub mod session;

/// Module for the token provider client
pub mod token;

/// Module for the media transport and audio playback seams
pub mod transport;

pub use client::{ClientState, ConnectionState, SessionActor, VoiceClient};
pub use config::ClientConfig;
pub use errors::{ClientError, TokenError, TransportError};
pub use events::{MessageLogEntry, MessageOrigin, RoomEvent, TrackInfo, TrackKind};
pub use identity::{IdentityError, RoomIdentity};
