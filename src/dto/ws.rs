use serde::{Deserialize, Serialize};

use crate::dto::player::PlayerState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Messages pushed by the server over the persistent channel.
///
/// Tagged by the `type` field. Unknown tags deserialize to
/// [`ServerMessage::Unknown`] so the protocol stays forward-compatible with
/// server additions; the read loop logs and drops them.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Wholesale roster snapshot sent right after the socket opens.
    Sync {
        /// Every other player currently tracked by the room.
        players: Vec<PlayerState>,
    },
    /// Another player joined the room.
    PlayerJoined {
        /// The newcomer's full state.
        player: PlayerState,
    },
    /// A player left the room deliberately.
    PlayerLeft {
        /// Identifier of the departed player.
        player_id: String,
        /// Display name of the departed player.
        player_name: String,
    },
    /// A player's socket dropped without an explicit leave.
    PlayerDisconnected {
        /// Identifier of the dropped player.
        player_id: String,
        /// Display name of the dropped player.
        player_name: String,
    },
    /// A previously disconnected player opened a new socket.
    PlayerReconnected {
        /// Identifier of the returning player.
        player_id: String,
        /// Display name of the returning player.
        player_name: String,
    },
    /// Full replacement state for one player (marks, bingo, liveness).
    PlayerUpdated {
        /// The player's new state.
        player: PlayerState,
    },
    /// A player completed a row, column, or diagonal.
    Bingo {
        /// Identifier of the winner.
        player_id: String,
        /// Display name of the winner.
        player_name: String,
    },
    /// Speech recognized by another participant, relayed by the server.
    Transcript {
        /// The recognized text.
        text: String,
    },
    /// The room aged out server-side and is being torn down.
    RoomExpired {
        /// Human-readable reason.
        message: String,
    },
    /// The room was reset and all players dropped.
    RoomReset {
        /// Human-readable reason.
        message: String,
    },
    /// Keepalive reply to a client ping.
    Pong,
    /// Server-side failure attached to this connection.
    Error {
        /// Human-readable description.
        message: String,
    },
    /// Any tag this client does not understand. Logged, never surfaced.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Decode a raw frame. Unknown `type` values succeed as
    /// [`ServerMessage::Unknown`]; malformed JSON is an error for the caller
    /// to log and drop.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Messages the client sends over the persistent channel.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Fire-and-forget request to mark a cell on the local player's board.
    MarkCell {
        /// Row index in `[0, 5)`.
        row: u8,
        /// Column index in `[0, 5)`.
        col: u8,
    },
    /// Keepalive probe; the server answers with `pong`.
    Ping,
}
