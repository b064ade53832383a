use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    error::{SyncError, SyncResult},
    state::{ConnectionState, GameEvent, SharedState},
};

/// How long a close waits for the server's acknowledgement before tearing
/// the tasks down.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Handle to one open persistent connection.
///
/// Owns the writer, reader, and keepalive tasks. The adapter never
/// reconnects on its own; when the connection drops, the state flips to
/// `Disconnected`/`Error` and recovery is an explicit join or switch in the
/// controller.
pub struct SocketHandle {
    tx: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    keepalive: JoinHandle<()>,
}

impl SocketHandle {
    /// Serialize a payload and queue it for sending.
    ///
    /// Fails with [`SyncError::NotConnected`] once the connection is closed;
    /// callers issuing best-effort sends (cell marks) log and drop that.
    pub fn send(&self, message: &ClientMessage) -> SyncResult<()> {
        let payload = serde_json::to_string(message)?;
        self.tx
            .send(Message::Text(payload.into()))
            .map_err(|_| SyncError::NotConnected)
    }

    /// Whether the connection is still accepting outbound messages.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Close the connection and wind the tasks down.
    ///
    /// Sends a close frame and waits briefly for the server to acknowledge;
    /// a dead peer cannot wedge teardown past [`CLOSE_GRACE`].
    pub async fn close(self) {
        let _ = self.tx.send(Message::Close(None));
        self.keepalive.abort();
        drop(self.tx);

        let reader_abort = self.reader.abort_handle();
        if tokio::time::timeout(CLOSE_GRACE, self.reader).await.is_err() {
            reader_abort.abort();
        }
        // All sender clones are gone by now, so the writer drains the close
        // frame and exits on its own.
        let _ = self.writer.await;
    }
}

/// Open the persistent channel for a room and spawn its tasks.
///
/// Transitions the connection state to `Connecting`, then `Connected` on a
/// successful handshake or `Error` on failure. Inbound messages are decoded
/// and applied strictly one at a time, so the registry never sees two pushes
/// concurrently.
pub async fn connect(
    state: &SharedState,
    meeting_id: &str,
    player_id: &str,
) -> SyncResult<SocketHandle> {
    state.set_connection(ConnectionState::Connecting);
    let url = state.config().ws_url(meeting_id, player_id);

    let (stream, _response) = match connect_async(url.as_str()).await {
        Ok(ok) => ok,
        Err(err) => {
            state.set_connection(ConnectionState::Error);
            return Err(err.into());
        }
    };

    state.set_connection(ConnectionState::Connected);
    info!(%meeting_id, %player_id, "persistent channel open");

    let (mut sink, mut source) = stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while the
    // reader is busy applying a push.
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    let ping_tx = outbound_tx.clone();
    let ping_interval = state.config().ping_interval();
    let keepalive = tokio::spawn(async move {
        let mut ticker = interval(ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it, the channel just opened.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Ok(payload) = serde_json::to_string(&ClientMessage::Ping) else {
                break;
            };
            if ping_tx.send(Message::Text(payload.into())).is_err() {
                break;
            }
        }
    });

    let reader_state = state.clone();
    let reply_tx = outbound_tx.clone();
    let local_id = player_id.to_string();
    let reader = tokio::spawn(async move {
        let mut errored = false;
        while let Some(message) = source.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    handle_frame(&reader_state, &local_id, text.as_str()).await;
                }
                Ok(Message::Ping(payload)) => {
                    let _ = reply_tx.send(Message::Pong(payload));
                }
                Ok(Message::Close(_)) => {
                    info!("server closed the persistent channel");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "persistent channel failed");
                    errored = true;
                    break;
                }
            }
        }
        reader_state.set_connection(if errored {
            ConnectionState::Error
        } else {
            ConnectionState::Disconnected
        });
    });

    Ok(SocketHandle {
        tx: outbound_tx,
        reader,
        writer,
        keepalive,
    })
}

/// Decode one inbound frame and apply it.
///
/// Malformed payloads are dropped with a warning; nothing escapes this
/// boundary, so the bus stays resilient to server evolution.
pub(crate) async fn handle_frame(state: &SharedState, local_id: &str, raw: &str) {
    let message = match ServerMessage::from_json_str(raw) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "dropping malformed frame");
            return;
        }
    };
    apply_message(state, local_id, message).await;
}

/// Apply one decoded push to the registry and publish the matching domain
/// event.
pub(crate) async fn apply_message(state: &SharedState, local_id: &str, message: ServerMessage) {
    match message {
        ServerMessage::Sync { players } => {
            let count = players.len();
            state.registry().write().await.apply_sync(players);
            state.hub().publish(GameEvent::RosterSynced { count });
        }
        ServerMessage::PlayerJoined { player } => {
            if player.player_id == local_id {
                // The server excludes us from our own broadcasts; drop the
                // echo if one shows up anyway.
                return;
            }
            state.registry().write().await.apply_joined(player.clone());
            state.hub().publish(GameEvent::PlayerJoined(player));
        }
        ServerMessage::PlayerLeft {
            player_id,
            player_name,
        }
        | ServerMessage::PlayerDisconnected {
            player_id,
            player_name,
        } => {
            state
                .registry()
                .write()
                .await
                .apply_left_or_disconnected(&player_id);
            state.hub().publish(GameEvent::PlayerLeft {
                player_id,
                player_name,
            });
        }
        ServerMessage::PlayerReconnected { player_id, .. } => {
            let updated = {
                let mut registry = state.registry().write().await;
                registry.apply_reconnected(&player_id);
                registry.get(&player_id).cloned()
            };
            if let Some(player) = updated {
                state.hub().publish(GameEvent::PlayerUpdated(player));
            }
        }
        ServerMessage::PlayerUpdated { player } => {
            if player.player_id == local_id {
                // The one place local marks become visible: the server's echo.
                let mut session = state.session().write().await;
                if let Some(session) = session.as_mut() {
                    session.local = player.clone();
                }
            } else {
                state.registry().write().await.apply_updated(player.clone());
            }
            state.hub().publish(GameEvent::PlayerUpdated(player));
        }
        ServerMessage::Bingo {
            player_id,
            player_name,
        } => {
            state.hub().publish(GameEvent::Bingo {
                player_id,
                player_name,
            });
        }
        ServerMessage::Transcript { text } => {
            state.hub().publish(GameEvent::Transcript { text });
        }
        ServerMessage::RoomExpired { message } | ServerMessage::RoomReset { message } => {
            info!(reason = %message, "room closed by the server");
            state.hub().publish(GameEvent::RoomClosed { reason: message });
        }
        ServerMessage::Pong => debug!("keepalive pong"),
        ServerMessage::Error { message } => {
            warn!(%message, "server reported an error on the channel");
            state.hub().publish(GameEvent::Error { message });
        }
        ServerMessage::Unknown => debug!("ignoring unknown message type"),
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::ClientConfig,
        dto::player::PlayerState,
        state::{ClientState, Session},
    };

    async fn joined_state() -> SharedState {
        let state = ClientState::new(ClientConfig::default()).unwrap();
        *state.session().write().await = Some(Session {
            meeting_id: "1234".into(),
            player_id: "me".into(),
            local: PlayerState::new("me", "Alice"),
            attempt: Uuid::new_v4(),
        });
        state
    }

    #[tokio::test]
    async fn duplicate_join_push_keeps_one_record() {
        let state = joined_state().await;
        let mut stale = PlayerState::new("p2", "Bob");
        stale.connected = false;
        state.registry().write().await.apply_joined(stale);

        apply_message(
            &state,
            "me",
            ServerMessage::PlayerJoined {
                player: PlayerState::new("p2", "Bob"),
            },
        )
        .await;

        let others = state.other_players().await;
        assert_eq!(others.len(), 1);
        assert!(others[0].connected);
    }

    #[tokio::test]
    async fn local_update_echo_lands_on_the_session_not_the_registry() {
        let state = joined_state().await;
        let mut receiver = state.subscribe();

        let mut echoed = PlayerState::new("me", "Alice");
        echoed.marked_cells.mark(2, 3);
        apply_message(&state, "me", ServerMessage::PlayerUpdated { player: echoed }).await;

        let local = state.local_player().await.unwrap();
        assert!(local.marked_cells.is_marked(2, 3));
        assert!(state.other_players().await.is_empty());
        assert!(matches!(
            receiver.try_recv().unwrap(),
            GameEvent::PlayerUpdated(player) if player.player_id == "me"
        ));
    }

    #[tokio::test]
    async fn departures_flag_players_without_removing_them() {
        let state = joined_state().await;
        state
            .registry()
            .write()
            .await
            .apply_joined(PlayerState::new("p2", "Bob"));

        apply_message(
            &state,
            "me",
            ServerMessage::PlayerDisconnected {
                player_id: "p2".into(),
                player_name: "Bob".into(),
            },
        )
        .await;

        let others = state.other_players().await;
        assert_eq!(others.len(), 1);
        assert!(!others[0].connected);
    }

    #[tokio::test]
    async fn reconnect_republishes_the_known_record() {
        let state = joined_state().await;
        state
            .registry()
            .write()
            .await
            .apply_joined(PlayerState::new("p2", "Bob"));
        state
            .registry()
            .write()
            .await
            .apply_left_or_disconnected("p2");
        let mut receiver = state.subscribe();

        apply_message(
            &state,
            "me",
            ServerMessage::PlayerReconnected {
                player_id: "p2".into(),
                player_name: "Bob".into(),
            },
        )
        .await;

        assert!(matches!(
            receiver.try_recv().unwrap(),
            GameEvent::PlayerUpdated(player) if player.connected
        ));
    }

    #[tokio::test]
    async fn reconnect_for_stranger_publishes_nothing() {
        let state = joined_state().await;
        let mut receiver = state.subscribe();

        apply_message(
            &state,
            "me",
            ServerMessage::PlayerReconnected {
                player_id: "ghost".into(),
                player_name: "Ghost".into(),
            },
        )
        .await;

        assert_eq!(receiver.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn malformed_frames_produce_no_event_and_no_panic() {
        let state = joined_state().await;
        let mut receiver = state.subscribe();

        handle_frame(&state, "me", "{definitely not json").await;
        handle_frame(&state, "me", "").await;
        handle_frame(&state, "me", r#"{"type":"sync"}"#).await;

        assert_eq!(receiver.try_recv().unwrap_err(), TryRecvError::Empty);

        // The channel keeps working after garbage.
        handle_frame(&state, "me", r#"{"type":"transcript","text":"synergy"}"#).await;
        assert!(matches!(
            receiver.try_recv().unwrap(),
            GameEvent::Transcript { .. }
        ));
    }

    #[tokio::test]
    async fn unknown_and_pong_messages_are_silent() {
        let state = joined_state().await;
        let mut receiver = state.subscribe();

        handle_frame(&state, "me", r#"{"type":"confetti"}"#).await;
        handle_frame(&state, "me", r#"{"type":"pong"}"#).await;

        assert_eq!(receiver.try_recv().unwrap_err(), TryRecvError::Empty);
    }

    #[tokio::test]
    async fn room_teardown_maps_to_room_closed() {
        let state = joined_state().await;
        let mut receiver = state.subscribe();

        apply_message(
            &state,
            "me",
            ServerMessage::RoomExpired {
                message: "Game session expired".into(),
            },
        )
        .await;

        assert_eq!(
            receiver.try_recv().unwrap(),
            GameEvent::RoomClosed {
                reason: "Game session expired".into()
            }
        );
    }
}
