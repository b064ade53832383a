use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::dto::player::PlayerState;

/// Authoritative local cache of the *other* players' state, keyed by
/// player identifier and kept in join order.
///
/// Every inbound push is applied here as a patch before the matching domain
/// event goes out on the bus. Records are never removed individually;
/// departures only flip `connected` off so stale boards remain visible until
/// the session ends. Mutation is serialized by the owner (the shared client
/// state holds this behind an async lock, and inbound messages are processed
/// one at a time), so no record can be patched concurrently.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: IndexMap<String, PlayerState>,
}

impl PlayerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire roster, used on initial connect.
    pub fn apply_sync(&mut self, players: Vec<PlayerState>) {
        self.players = players
            .into_iter()
            .map(|player| (player.player_id.clone(), player))
            .collect();
    }

    /// Insert a newcomer. A duplicate join for a known id replaces the
    /// existing record; join is idempotent by player_id.
    pub fn apply_joined(&mut self, player: PlayerState) {
        if self.players.contains_key(&player.player_id) {
            debug!(player_id = %player.player_id, "duplicate join replaces existing record");
        }
        self.players.insert(player.player_id.clone(), player);
    }

    /// Flag a player as gone without dropping their record.
    pub fn apply_left_or_disconnected(&mut self, player_id: &str) {
        match self.players.get_mut(player_id) {
            Some(player) => player.connected = false,
            None => debug!(player_id, "departure for a player we never tracked"),
        }
    }

    /// Flag a player as back online. Unknown ids are an anomaly worth a log
    /// line, not a failure.
    pub fn apply_reconnected(&mut self, player_id: &str) {
        match self.players.get_mut(player_id) {
            Some(player) => player.connected = true,
            None => warn!(player_id, "reconnect for an unknown player; ignoring"),
        }
    }

    /// Full replace-by-id. An unknown id is treated as an implicit join so a
    /// missed `player_joined` cannot wedge the roster.
    pub fn apply_updated(&mut self, player: PlayerState) {
        self.players.insert(player.player_id.clone(), player);
    }

    /// Current state for one player, if tracked.
    pub fn get(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.get(player_id)
    }

    /// Snapshot of the roster in join order.
    pub fn snapshot(&self) -> Vec<PlayerState> {
        self.players.values().cloned().collect()
    }

    /// Number of tracked players, connected or not.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no players are tracked.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Drop everything; only called when the session ends.
    pub fn clear(&mut self) {
        self.players.clear();
    }
}
