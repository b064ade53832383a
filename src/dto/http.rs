use serde::{Deserialize, Serialize};

use crate::dto::player::PlayerState;

#[derive(Debug, Serialize, Deserialize)]
/// Body of `POST /api/join`.
pub struct JoinRequest {
    /// Room to join or create.
    pub meeting_id: String,
    /// Display name for the local player.
    pub player_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
/// Response to a successful join.
pub struct JoinResponse {
    /// Server-assigned identifier for the local player.
    pub player_id: String,
    /// Room that was joined.
    pub meeting_id: String,
    /// Roster of the *other* players already in the room.
    pub players: Vec<PlayerState>,
}

#[derive(Debug, Serialize, Deserialize)]
/// Body of `POST /api/mark`, the REST fallback for cell marks when the
/// persistent channel is down.
pub struct MarkCellRequest {
    /// Room the mark applies to.
    pub meeting_id: String,
    /// Player marking the cell.
    pub player_id: String,
    /// Row index in `[0, 5)`.
    pub row: u8,
    /// Column index in `[0, 5)`.
    pub col: u8,
}

#[derive(Debug, Serialize, Deserialize)]
/// Response to a REST cell mark.
pub struct MarkCellResponse {
    /// Always "ok" on success.
    pub status: String,
    /// Whether the mark completed a bingo.
    pub has_bingo: bool,
}

#[derive(Debug, Serialize, Deserialize)]
/// Response to `GET /api/room/{meeting_id}`.
pub struct RoomStateResponse {
    /// Room the snapshot describes.
    pub meeting_id: String,
    /// All player states in the room.
    pub players: Vec<PlayerState>,
    /// Total player count, including disconnected records.
    pub player_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
/// Response to `GET /health`.
pub struct HealthResponse {
    /// Health status reported by the server.
    pub status: String,
    /// Number of active rooms.
    pub rooms: usize,
}
