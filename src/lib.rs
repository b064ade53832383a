//! Client-side synchronization core for the Meeting Bingo game protocol.
//!
//! Joins a game room over REST, keeps the roster of other players in sync
//! through a persistent WebSocket, and fans reconciled domain events out to
//! subscribers. UI layers and the device-facing subsystems (speech, OCR,
//! meeting detection) sit outside this crate and exchange plain data with it:
//! detected meeting ids go into [`services::controller::switch_room`],
//! recognized text into [`services::controller::ingest_transcript`], and
//! everything flowing back rides the [`state::GameEvent`] bus.

pub mod config;
pub mod dto;
pub mod error;
pub mod services;
pub mod state;
pub mod words;

pub use config::ClientConfig;
pub use error::{SyncError, SyncResult};
pub use state::{ClientState, ConnectionState, GameEvent, SessionPhase, SharedState};
