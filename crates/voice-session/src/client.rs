//! Connection state machine for one voice session.
//!
//! `SessionActor` owns all mutable session state and serializes every
//! mutation through one task: commands arrive on a mailbox, transport
//! events on the session's event channel, and both are multiplexed with
//! `tokio::select!`. There are no locks; suspend points (token fetch,
//! transport connect, microphone enable, close) re-validate intent when
//! they resume.
//!
//! # Lifecycle
//!
//! `Disconnected -> Connecting -> Connected -> Disconnected`. There is no
//! separate error state: a failed connect returns to `Disconnected`
//! carrying a short error message in the published state. A mid-session
//! transport disconnect is handled exactly like a local disconnect,
//! because the transport is the authoritative source of liveness.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::dispatcher::EventDispatcher;
use crate::errors::ClientError;
use crate::events::{MessageLogEntry, RoomEvent};
use crate::identity::RoomIdentity;
use crate::session::SessionHandle;
use crate::token::TokenClient;
use crate::transport::{AudioOutput, ConnectedRoom, MediaConstraints, MediaTransport};

/// Command mailbox buffer size.
const COMMAND_CHANNEL_BUFFER: usize = 32;

/// System log entry appended when a session becomes live.
const CONNECTED_MESSAGE: &str = "Connected to AI voice assistant. Start speaking to interact.";

/// System log entry appended when a live session ends.
const DISCONNECTED_MESSAGE: &str = "Disconnected from AI voice assistant.";

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No live session; connect may be called.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// Exactly one session is live.
    Connected,
}

impl ConnectionState {
    /// Lowercase string form, matching the serialized representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of everything the presentation layer depends on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    /// Current lifecycle state.
    pub connection_state: ConnectionState,
    /// Insertion-ordered message log.
    pub messages: Vec<MessageLogEntry>,
    /// Message from the most recent failed connect, if any.
    pub error: Option<String>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            connection_state: ConnectionState::Disconnected,
            messages: Vec::new(),
            error: None,
        }
    }
}

/// Commands sent to the session actor.
#[derive(Debug)]
enum ClientCommand {
    /// Open a session (no-op unless disconnected).
    Connect,
    /// Close the live session (idempotent).
    Disconnect,
    /// Disconnect if connected, otherwise connect.
    Toggle,
}

/// Handle to a running session actor.
#[derive(Clone)]
pub struct VoiceClient {
    sender: mpsc::Sender<ClientCommand>,
    state_rx: watch::Receiver<ClientState>,
    cancel_token: CancellationToken,
}

impl VoiceClient {
    /// Request a connection.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Stopped` if the actor has exited.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.send(ClientCommand::Connect).await
    }

    /// Request a disconnect.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Stopped` if the actor has exited.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.send(ClientCommand::Disconnect).await
    }

    /// Disconnect if connected, otherwise connect.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Stopped` if the actor has exited.
    pub async fn toggle_connection(&self) -> Result<(), ClientError> {
        self.send(ClientCommand::Toggle).await
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state_rx.borrow().clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().connection_state
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.state_rx.clone()
    }

    /// Stop the actor, tearing down any live session.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    async fn send(&self, command: ClientCommand) -> Result<(), ClientError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| ClientError::Stopped)
    }
}

/// The session actor implementation.
pub struct SessionActor {
    config: ClientConfig,
    identity: RoomIdentity,
    token_client: TokenClient,
    transport: Arc<dyn MediaTransport>,
    audio: Arc<dyn AudioOutput>,
    receiver: mpsc::Receiver<ClientCommand>,
    state_tx: watch::Sender<ClientState>,
    cancel_token: CancellationToken,
    connection_state: ConnectionState,
    log: Vec<MessageLogEntry>,
    error: Option<String>,
    session: Option<SessionHandle>,
    dispatcher: Option<EventDispatcher>,
    events: Option<mpsc::Receiver<RoomEvent>>,
}

impl SessionActor {
    /// Spawn a session actor for one room identity.
    ///
    /// Returns a cloneable handle and the task join handle.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Token` if the token HTTP client cannot be
    /// built from the configuration.
    pub fn spawn(
        config: ClientConfig,
        identity: RoomIdentity,
        transport: Arc<dyn MediaTransport>,
        audio: Arc<dyn AudioOutput>,
    ) -> Result<(VoiceClient, JoinHandle<()>), ClientError> {
        let token_client = TokenClient::new(&config)?;
        let (sender, receiver) = mpsc::channel(COMMAND_CHANNEL_BUFFER);
        let (state_tx, state_rx) = watch::channel(ClientState::default());
        let cancel_token = CancellationToken::new();

        let actor = Self {
            config,
            identity,
            token_client,
            transport,
            audio,
            receiver,
            state_tx,
            cancel_token: cancel_token.clone(),
            connection_state: ConnectionState::Disconnected,
            log: Vec::new(),
            error: None,
            session: None,
            dispatcher: None,
            events: None,
        };

        let task_handle = tokio::spawn(actor.run());

        let client = VoiceClient {
            sender,
            state_rx,
            cancel_token,
        };

        Ok((client, task_handle))
    }

    /// Run the actor loop.
    #[instrument(
        skip_all,
        name = "vs.client",
        fields(room = %self.identity.room_name(), user = %self.identity.user_name())
    )]
    async fn run(mut self) {
        debug!(target: "vs.client", "Session actor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(target: "vs.client", "Session actor received shutdown signal");
                    self.teardown().await;
                    self.set_state(ConnectionState::Disconnected);
                    break;
                }

                command = self.receiver.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!(target: "vs.client", "All client handles dropped, exiting");
                        self.teardown().await;
                        break;
                    }
                },

                event = next_event(&mut self.events) => self.handle_event(event).await,
            }
        }

        info!(target: "vs.client", "Session actor stopped");
    }

    async fn handle_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Connect => self.handle_connect().await,
            ClientCommand::Disconnect => self.handle_disconnect().await,
            ClientCommand::Toggle => {
                if self.connection_state == ConnectionState::Connected {
                    self.handle_disconnect().await;
                } else {
                    self.handle_connect().await;
                }
            }
        }
    }

    /// Open a session: fetch a credential, connect the transport, enable
    /// the microphone.
    ///
    /// The mailbox keeps draining while the attempt is in flight so a
    /// disconnect issued mid-connect is honored the moment the in-flight
    /// step resumes: the continuation tears down whatever was built
    /// instead of installing it.
    async fn handle_connect(&mut self) {
        if self.connection_state != ConnectionState::Disconnected {
            debug!(
                target: "vs.client",
                state = %self.connection_state,
                "Ignoring connect; session already active"
            );
            return;
        }

        // A fresh logical session starts with an empty log and a clean
        // error surface
        self.log.clear();
        self.error = None;
        self.set_state(ConnectionState::Connecting);

        let (outcome, disconnect_requested) = {
            let establish = establish_session(
                &self.token_client,
                self.transport.as_ref(),
                &self.config,
                &self.identity,
            );
            tokio::pin!(establish);

            let mut disconnect_requested = false;
            let outcome = loop {
                tokio::select! {
                    outcome = &mut establish => break outcome,

                    () = self.cancel_token.cancelled(), if !disconnect_requested => {
                        disconnect_requested = true;
                    }

                    command = self.receiver.recv(), if !disconnect_requested => match command {
                        Some(ClientCommand::Disconnect) => disconnect_requested = true,
                        Some(ClientCommand::Connect | ClientCommand::Toggle) => {
                            debug!(
                                target: "vs.client",
                                "Ignoring connect while a connect is in flight"
                            );
                        }
                        None => disconnect_requested = true,
                    },
                }
            };
            (outcome, disconnect_requested)
        };

        match outcome {
            Ok(connected) if disconnect_requested => {
                info!(target: "vs.client", "Connect cancelled by disconnect request");
                let mut session = SessionHandle::new(connected.room);
                session.close().await;
                self.set_state(ConnectionState::Disconnected);
            }
            Ok(connected) => {
                self.session = Some(SessionHandle::new(connected.room));
                self.events = Some(connected.events);
                self.dispatcher = Some(EventDispatcher::new(Arc::clone(&self.audio)));
                self.push_entry(MessageLogEntry::system(CONNECTED_MESSAGE));
                self.set_state(ConnectionState::Connected);
                info!(target: "vs.client", "Connected to room");
            }
            Err(e) => {
                // Partial resources were already released inside the
                // establish step
                warn!(target: "vs.client", error = %e, "Connect attempt failed");
                self.error = Some(e.client_message());
                self.set_state(ConnectionState::Disconnected);
            }
        }
    }

    /// Close the live session. Idempotent: a no-op unless connected.
    async fn handle_disconnect(&mut self) {
        if self.connection_state != ConnectionState::Connected {
            debug!(target: "vs.client", "Ignoring disconnect; no live session");
            return;
        }

        self.teardown().await;
        self.push_entry(MessageLogEntry::system(DISCONNECTED_MESSAGE));
        self.set_state(ConnectionState::Disconnected);
        info!(target: "vs.client", "Disconnected from room");
    }

    async fn handle_event(&mut self, event: Option<RoomEvent>) {
        match event {
            Some(RoomEvent::Disconnected { reason }) => {
                info!(
                    target: "vs.client",
                    reason = ?reason,
                    "Transport reported disconnect"
                );
                self.resync_disconnected().await;
            }
            None => {
                info!(target: "vs.client", "Transport event stream closed");
                self.resync_disconnected().await;
            }
            Some(event) => {
                let entry = self
                    .dispatcher
                    .as_mut()
                    .and_then(|dispatcher| dispatcher.ingest(event));
                if let Some(entry) = entry {
                    self.push_entry(entry);
                }
            }
        }
    }

    /// Resynchronize to disconnected after a transport-initiated drop.
    ///
    /// Not an error from the user's perspective; the log gets the same
    /// informational entry as a local disconnect.
    async fn resync_disconnected(&mut self) {
        if self.connection_state != ConnectionState::Connected {
            return;
        }

        self.teardown().await;
        self.push_entry(MessageLogEntry::system(DISCONNECTED_MESSAGE));
        self.set_state(ConnectionState::Disconnected);
    }

    /// Release everything the live session acquired: playback sinks,
    /// microphone, transport connection.
    async fn teardown(&mut self) {
        if let Some(mut dispatcher) = self.dispatcher.take() {
            dispatcher.release_all();
        }
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.events = None;
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.connection_state != state {
            debug!(
                target: "vs.client",
                from = %self.connection_state,
                to = %state,
                "State transition"
            );
        }
        self.connection_state = state;
        self.publish();
    }

    fn push_entry(&mut self, entry: MessageLogEntry) {
        self.log.push(entry);
        self.publish();
    }

    fn publish(&self) {
        self.state_tx.send_replace(ClientState {
            connection_state: self.connection_state,
            messages: self.log.clone(),
            error: self.error.clone(),
        });
    }
}

/// Await the next transport event, or hang forever when no session is
/// live (the select branch is effectively disabled).
async fn next_event(events: &mut Option<mpsc::Receiver<RoomEvent>>) -> Option<RoomEvent> {
    match events {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// The connect sequence: credential, transport connection, microphone.
///
/// A token failure aborts before any transport attempt. A microphone
/// failure releases the half-built session exactly once before surfacing
/// the error. The credential lives on this stack frame only.
async fn establish_session(
    token_client: &TokenClient,
    transport: &dyn MediaTransport,
    config: &ClientConfig,
    identity: &RoomIdentity,
) -> Result<ConnectedRoom, ClientError> {
    let credential = token_client.fetch(identity).await?;

    let mut connected = transport
        .connect(
            &config.server_url,
            &credential,
            identity,
            MediaConstraints::audio_only(),
        )
        .await?;

    if let Err(e) = connected.room.set_microphone_enabled(true).await {
        let mut session = SessionHandle::new(connected.room);
        session.close().await;
        return Err(ClientError::Transport(e));
    }

    Ok(connected)
}
