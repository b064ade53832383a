use thiserror::Error;
use uuid::Uuid;

use crate::dto::player::PlayerState;

/// Phases of the local player's room membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not in any room; joins are accepted.
    NotJoined,
    /// A join request is in flight.
    Joining,
    /// Member of a room with a live session.
    Joined,
    /// A leave is in progress; ends in `NotJoined` unconditionally.
    Leaving,
}

/// Events that drive the session phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A join (or room switch) was requested.
    JoinRequested,
    /// The join round-trip succeeded and the socket is open.
    JoinSucceeded,
    /// The join round-trip failed; back to square one.
    JoinFailed,
    /// A leave was requested.
    LeaveRequested,
    /// Local teardown finished.
    LeaveFinished,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Phase machine for room membership:
/// `NotJoined → Joining → Joined → Leaving → NotJoined`, with
/// `Joined → Joining` allowed directly so a room switch composes
/// leave-then-join as one logical transition, and `Joining → Joining` so a
/// fresh join attempt can supersede an abandoned one.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    phase: SessionPhase,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::NotJoined,
        }
    }
}

impl SessionMachine {
    /// New machine in the `NotJoined` phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Apply an event, returning the next phase or a typed rejection.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        use SessionEvent::*;
        use SessionPhase::*;

        let next = match (self.phase, event) {
            (NotJoined, JoinRequested) => Joining,
            // Room switch: leave-then-join composed as one transition.
            (Joined, JoinRequested) => Joining,
            // A new attempt supersedes an abandoned in-flight join.
            (Joining, JoinRequested) => Joining,
            (Joining, JoinSucceeded) => Joined,
            (Joining, JoinFailed) => NotJoined,
            (Joined, LeaveRequested) | (Joining, LeaveRequested) => Leaving,
            (Leaving, LeaveFinished) => NotJoined,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        self.phase = next;
        Ok(next)
    }

    /// Force the machine back to `NotJoined`. Leave clears local state
    /// unconditionally, so teardown must never be blocked by the phase we
    /// happen to be in when the network goes away.
    pub fn reset(&mut self) {
        self.phase = SessionPhase::NotJoined;
    }
}

/// Lifecycle of the single transport connection backing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket. The initial state, and where clean closes land.
    Disconnected,
    /// Socket handshake in flight.
    Connecting,
    /// Socket open; pushes are flowing.
    Connected,
    /// The transport failed. Recoverable only by an explicit join or switch.
    Error,
}

impl ConnectionState {
    /// Whether a fresh `Connecting` transition is permitted from here.
    pub fn may_connect(self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Error)
    }
}

/// Identity and per-room data owned by the session controller.
#[derive(Debug, Clone)]
pub struct Session {
    /// Room this session belongs to.
    pub meeting_id: String,
    /// Server-assigned identifier for the local player.
    pub player_id: String,
    /// Last state the server echoed back for the local player. Marks show up
    /// here only after the server reflects them; there is no optimistic
    /// local mutation.
    pub local: PlayerState,
    /// Token identifying the join attempt that produced this session. A late
    /// response from an abandoned join carries a stale token and is
    /// discarded.
    pub attempt: Uuid,
}
