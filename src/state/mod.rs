//! Shared client state: registry, session machine, event hub, connection flag.

pub mod events;
pub mod registry;
pub mod session;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{Mutex, RwLock, broadcast, watch};
use uuid::Uuid;

use crate::{
    config::ClientConfig,
    dto::player::PlayerState,
    error::SyncResult,
    services::{rest::ApiClient, socket::SocketHandle},
    words::WordGrid,
};

pub use self::events::{EventHub, GameEvent};
pub use self::registry::PlayerRegistry;
pub use self::session::{ConnectionState, Session, SessionPhase};
use self::session::{InvalidTransition, SessionEvent, SessionMachine};

/// Cheaply cloneable handle to the whole client core.
pub type SharedState = Arc<ClientState>;

/// Central state for one client instance.
///
/// Constructed explicitly and passed by `Arc` to every collaborator; there
/// are no process-wide singletons. The registry and session fields are
/// behind async locks, and inbound messages are applied one at a time by the
/// single socket read loop, so no two pushes ever patch the registry
/// concurrently.
pub struct ClientState {
    config: ClientConfig,
    api: ApiClient,
    hub: EventHub,
    registry: RwLock<PlayerRegistry>,
    machine: RwLock<SessionMachine>,
    session: RwLock<Option<Session>>,
    socket: Mutex<Option<SocketHandle>>,
    connection: watch::Sender<ConnectionState>,
    grid: RwLock<WordGrid>,
    /// Token of the most recent join attempt; late responses from superseded
    /// attempts check against this and get discarded.
    attempt: Mutex<Option<Uuid>>,
    /// When the last successful join completed, for switch debouncing.
    last_join: Mutex<Option<Instant>>,
    /// Serializes join/leave/switch sequences end to end.
    op_gate: Mutex<()>,
}

impl ClientState {
    /// Construct a new [`ClientState`] wrapped in an [`Arc`] so it can be
    /// cloned cheaply. Generates the initial word grid from the configured
    /// pool.
    pub fn new(config: ClientConfig) -> SyncResult<SharedState> {
        let api = ApiClient::new(&config)?;
        let grid = WordGrid::generate(config.word_pool());
        let (connection, _rx) = watch::channel(ConnectionState::Disconnected);
        // Broadcast channels reject a zero capacity.
        let hub = EventHub::new(config.event_capacity().max(1));

        Ok(Arc::new(Self {
            config,
            api,
            hub,
            registry: RwLock::new(PlayerRegistry::new()),
            machine: RwLock::new(SessionMachine::new()),
            session: RwLock::new(None),
            socket: Mutex::new(None),
            connection,
            grid: RwLock::new(grid),
            attempt: Mutex::new(None),
            last_join: Mutex::new(None),
            op_gate: Mutex::new(()),
        }))
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// REST half of the transport.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The event hub downstream layers subscribe to.
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// Register a new event subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.hub.subscribe()
    }

    /// Registry of the other players' state.
    pub fn registry(&self) -> &RwLock<PlayerRegistry> {
        &self.registry
    }

    /// Snapshot of the other players, in join order.
    pub async fn other_players(&self) -> Vec<PlayerState> {
        self.registry.read().await.snapshot()
    }

    /// Currently active session data.
    pub fn session(&self) -> &RwLock<Option<Session>> {
        &self.session
    }

    /// Last server echo of the local player's state, if joined.
    pub async fn local_player(&self) -> Option<PlayerState> {
        self.session.read().await.as_ref().map(|s| s.local.clone())
    }

    /// Handle to the persistent connection, if one is open.
    pub fn socket(&self) -> &Mutex<Option<SocketHandle>> {
        &self.socket
    }

    /// Current phase of the session machine.
    pub async fn session_phase(&self) -> SessionPhase {
        self.machine.read().await.phase()
    }

    /// Apply an event to the session machine.
    pub(crate) async fn apply_session_event(
        &self,
        event: SessionEvent,
    ) -> Result<SessionPhase, InvalidTransition> {
        self.machine.write().await.apply(event)
    }

    /// Force the session machine back to `NotJoined`.
    pub(crate) async fn reset_session_machine(&self) {
        self.machine.write().await.reset();
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn connection_watcher(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Update the connection flag, notifying watchers on change.
    pub(crate) fn set_connection(&self, value: ConnectionState) {
        self.connection.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Copy of the current word grid.
    pub async fn current_grid(&self) -> WordGrid {
        self.grid.read().await.clone()
    }

    /// Swap in a freshly generated card.
    pub(crate) async fn replace_grid(&self, grid: WordGrid) {
        *self.grid.write().await = grid;
    }

    /// Start a new join attempt, superseding any in-flight one.
    pub(crate) async fn begin_attempt(&self) -> Uuid {
        let token = Uuid::new_v4();
        *self.attempt.lock().await = Some(token);
        token
    }

    /// Whether `token` still identifies the current join attempt.
    pub(crate) async fn attempt_is_current(&self, token: Uuid) -> bool {
        *self.attempt.lock().await == Some(token)
    }

    /// Record the completion time of a successful join for debouncing.
    pub(crate) async fn mark_joined_now(&self) {
        *self.last_join.lock().await = Some(Instant::now());
    }

    /// Time since the last successful join, if any.
    pub(crate) async fn since_last_join(&self) -> Option<Duration> {
        self.last_join.lock().await.map(|at| at.elapsed())
    }

    /// Gate that serializes join/leave/switch sequences.
    pub(crate) fn op_gate(&self) -> &Mutex<()> {
        &self.op_gate
    }
}
