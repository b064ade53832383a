use serde::{Deserialize, Serialize};

use crate::words::GRID_SIZE;

/// 5x5 grid of marked cells.
///
/// Serialized as a 5x5 JSON array of booleans; the shape is enforced by the
/// type, so a wrong-sized grid on the wire is a decode error rather than a
/// runtime surprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([[bool; GRID_SIZE]; GRID_SIZE]);

impl Board {
    /// Empty board with the free center cell pre-marked, matching what the
    /// server hands out on join.
    pub fn with_free_center() -> Self {
        let mut board = Self::default();
        let center = GRID_SIZE / 2;
        board.0[center][center] = true;
        board
    }

    /// Whether the cell at `(row, col)` is marked. Out-of-bounds reads false.
    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        self.0
            .get(row)
            .and_then(|cells| cells.get(col))
            .copied()
            .unwrap_or(false)
    }

    /// Mark the cell at `(row, col)`; out-of-bounds is ignored.
    pub fn mark(&mut self, row: usize, col: usize) {
        if row < GRID_SIZE && col < GRID_SIZE {
            self.0[row][col] = true;
        }
    }

    /// Win condition: a fully marked row, column, or diagonal.
    pub fn has_bingo(&self) -> bool {
        let cells = &self.0;

        if cells.iter().any(|row| row.iter().all(|&marked| marked)) {
            return true;
        }

        if (0..GRID_SIZE).any(|col| (0..GRID_SIZE).all(|row| cells[row][col])) {
            return true;
        }

        (0..GRID_SIZE).all(|i| cells[i][i])
            || (0..GRID_SIZE).all(|i| cells[i][GRID_SIZE - 1 - i])
    }

    /// Number of marked cells.
    pub fn marked_count(&self) -> usize {
        self.0
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&marked| marked)
            .count()
    }
}

/// State of one player in the room, exactly as serialized by the server.
///
/// Created from the join response or a `player_joined` push; mutated only by
/// `player_updated` pushes. Disconnected players keep their record with
/// `connected` flipped off so stale boards stay visible until the session
/// ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Opaque identifier, unique per session.
    pub player_id: String,
    /// Display name chosen by the player.
    pub player_name: String,
    /// The player's board. Mutable by server broadcast only.
    pub marked_cells: Board,
    /// Whether the server has observed a bingo on this board.
    pub has_bingo: bool,
    /// Liveness flag; false once the player left or dropped.
    pub connected: bool,
}

impl PlayerState {
    /// Fresh state for a player who just joined, mirroring the server-side
    /// constructor: free center marked, no bingo, connected.
    pub fn new(player_id: impl Into<String>, player_name: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            player_name: player_name.into(),
            marked_cells: Board::with_free_center(),
            has_bingo: false,
            connected: true,
        }
    }
}
