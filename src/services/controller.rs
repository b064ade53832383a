use tracing::{debug, info, warn};

use crate::{
    dto::{http::MarkCellRequest, player::PlayerState, ws::ClientMessage},
    error::{SyncError, SyncResult},
    state::{
        ConnectionState, GameEvent, Session, SessionPhase, SharedState,
        session::SessionEvent,
    },
    services::socket,
    words::{GRID_SIZE, WordGrid},
};

/// Join a room, open the persistent channel, and push the local card.
///
/// Serialized against other join/leave/switch calls. Joining the room the
/// session is already in is a no-op, so the card is never pushed twice for
/// one membership. Failure surfaces to the caller and leaves the session in
/// `NotJoined`; it is never retried automatically.
pub async fn join(state: &SharedState, meeting_id: &str, player_name: &str) -> SyncResult<()> {
    let _gate = state.op_gate().lock().await;
    join_locked(state, meeting_id, player_name).await
}

async fn join_locked(state: &SharedState, meeting_id: &str, player_name: &str) -> SyncResult<()> {
    if state.session_phase().await == SessionPhase::Joined {
        let same_room = state
            .session()
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.meeting_id == meeting_id);
        if same_room {
            debug!(%meeting_id, "already joined; nothing to do");
            return Ok(());
        }
        // Joining a different room while joined composes leave-then-join, so
        // the old socket and server-side record are never leaked.
        if let Err(err) = leave_locked(state).await {
            warn!(error = %err, "leave before re-join failed; continuing");
        }
    }

    state.apply_session_event(SessionEvent::JoinRequested).await?;
    let attempt = state.begin_attempt().await;

    let response = match state.api().join(meeting_id, player_name).await {
        Ok(response) => response,
        Err(err) => {
            if state.attempt_is_current(attempt).await {
                let _ = state.apply_session_event(SessionEvent::JoinFailed).await;
            }
            return Err(err);
        }
    };

    // An abandoned join's late response must not touch current state.
    if !state.attempt_is_current(attempt).await {
        debug!(%meeting_id, "discarding late response from a superseded join");
        return Err(SyncError::InvalidState("join attempt superseded".into()));
    }

    let count = response.players.len();
    state.registry().write().await.apply_sync(response.players);
    state.hub().publish(GameEvent::RosterSynced { count });

    let player_id = response.player_id;
    *state.session().write().await = Some(Session {
        meeting_id: meeting_id.to_string(),
        player_id: player_id.clone(),
        local: PlayerState::new(player_id.clone(), player_name),
        attempt,
    });

    let handle = match socket::connect(state, meeting_id, &player_id).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(error = %err, "persistent channel failed to open; abandoning join");
            *state.session().write().await = None;
            state.registry().write().await.clear();
            let _ = state.apply_session_event(SessionEvent::JoinFailed).await;
            return Err(err);
        }
    };
    *state.socket().lock().await = Some(handle);

    // Words must reach the server before transcript-triggered marking can
    // attribute cells.
    let grid = state.current_grid().await;
    if let Err(err) = state.api().set_words(meeting_id, &player_id, &grid).await {
        warn!(error = %err, "failed to push the word grid; marks will not attribute until a re-push");
    }

    state.apply_session_event(SessionEvent::JoinSucceeded).await?;
    state.mark_joined_now().await;
    info!(%meeting_id, %player_id, others = count, "joined room");
    Ok(())
}

/// Leave the current room.
///
/// Best effort: the socket closes and local session/registry state clears
/// unconditionally, then any network failure from the leave request is
/// returned so the caller can react. The client never stays stuck "in" a
/// room it can no longer reach.
pub async fn leave(state: &SharedState) -> SyncResult<()> {
    let _gate = state.op_gate().lock().await;
    leave_locked(state).await
}

async fn leave_locked(state: &SharedState) -> SyncResult<()> {
    let Some(session) = state.session().write().await.take() else {
        debug!("leave with no active session; nothing to do");
        return Ok(());
    };

    let _ = state.apply_session_event(SessionEvent::LeaveRequested).await;

    let handle = state.socket().lock().await.take();
    if let Some(handle) = handle {
        handle.close().await;
    }

    let result = state
        .api()
        .leave(&session.meeting_id, &session.player_id)
        .await;

    state.registry().write().await.clear();
    state.reset_session_machine().await;
    state.set_connection(ConnectionState::Disconnected);
    info!(meeting_id = %session.meeting_id, "left room");
    result
}

/// Switch to another room, debounced against detection noise.
///
/// Switching is skipped when `new_meeting_id` matches the current room and
/// the last join is younger than the configured cooldown; a same-id call
/// past the cooldown forces a refresh re-join, and a different id always
/// switches. Returns whether a leave+join pair actually ran.
pub async fn switch_room(state: &SharedState, new_meeting_id: &str) -> SyncResult<bool> {
    let _gate = state.op_gate().lock().await;

    let current = state
        .session()
        .read()
        .await
        .as_ref()
        .map(|session| (session.meeting_id.clone(), session.local.player_name.clone()));
    let Some((current_id, player_name)) = current else {
        return Err(SyncError::InvalidState(
            "no active session to switch from".into(),
        ));
    };

    if current_id == new_meeting_id {
        match state.since_last_join().await {
            Some(elapsed) if elapsed < state.config().switch_cooldown() => {
                debug!(%new_meeting_id, ?elapsed, "switch debounced inside the cooldown window");
                return Ok(false);
            }
            _ => debug!(%new_meeting_id, "cooldown elapsed; refreshing room membership"),
        }
    }

    if let Err(err) = leave_locked(state).await {
        warn!(error = %err, "leave during room switch failed; continuing with the join");
    }
    join_locked(state, new_meeting_id, &player_name).await?;
    Ok(true)
}

/// Mark a cell on the local player's board.
///
/// Fire and forget: the mark is sent over the persistent channel (REST
/// fallback when it is down) and becomes visible only through the server's
/// `player_updated` echo. There is no optimistic local mutation; the server
/// stays the single source of truth. Bad coordinates and calls made before
/// joining are rejected locally without a network call, and send failures
/// are logged and dropped.
pub async fn mark_cell(state: &SharedState, row: u8, col: u8) -> SyncResult<()> {
    if usize::from(row) >= GRID_SIZE || usize::from(col) >= GRID_SIZE {
        return Err(SyncError::InvalidState(format!(
            "cell ({row}, {col}) is outside the board"
        )));
    }
    if state.session_phase().await != SessionPhase::Joined {
        return Err(SyncError::InvalidState(
            "cannot mark a cell before joining a room".into(),
        ));
    }

    {
        let socket_guard = state.socket().lock().await;
        if let Some(handle) = socket_guard.as_ref() {
            match handle.send(&ClientMessage::MarkCell { row, col }) {
                Ok(()) => return Ok(()),
                Err(SyncError::NotConnected) => {
                    debug!(row, col, "socket closed; marking over REST instead");
                }
                Err(err) => return Err(err),
            }
        }
    }

    let request = {
        let session = state.session().read().await;
        let Some(session) = session.as_ref() else {
            return Err(SyncError::InvalidState("session ended mid-mark".into()));
        };
        MarkCellRequest {
            meeting_id: session.meeting_id.clone(),
            player_id: session.player_id.clone(),
            row,
            col,
        }
    };

    if let Err(err) = state.api().mark_cell(&request).await {
        warn!(error = %err, row, col, "cell mark dropped");
    }
    Ok(())
}

/// Regenerate the word grid wholesale and re-push it when joined.
pub async fn new_card(state: &SharedState) -> SyncResult<WordGrid> {
    let grid = WordGrid::generate(state.config().word_pool());
    state.replace_grid(grid.clone()).await;
    info!("generated a new card");

    if state.session_phase().await == SessionPhase::Joined {
        let ids = state
            .session()
            .read()
            .await
            .as_ref()
            .map(|session| (session.meeting_id.clone(), session.player_id.clone()));
        if let Some((meeting_id, player_id)) = ids {
            state.api().set_words(&meeting_id, &player_id, &grid).await?;
        }
    }
    Ok(grid)
}

/// Feed recognized speech into the core.
///
/// The speech layer producing the text is an external collaborator; the
/// string is treated as opaque. Publishes a transcript event, then sends a
/// best-effort mark for every grid word the text contains that the server
/// has not already echoed as marked. Returns the cells a mark was sent for.
pub async fn ingest_transcript(state: &SharedState, text: &str) -> Vec<(u8, u8)> {
    state.hub().publish(GameEvent::Transcript {
        text: text.to_string(),
    });

    if state.session_phase().await != SessionPhase::Joined {
        return Vec::new();
    }

    let grid = state.current_grid().await;
    let already_marked = state
        .local_player()
        .await
        .map(|player| player.marked_cells)
        .unwrap_or_default();

    let mut sent = Vec::new();
    for (row, col) in grid.find_matches(text) {
        if already_marked.is_marked(row.into(), col.into()) {
            continue;
        }
        if mark_cell(state, row, col).await.is_ok() {
            sent.push((row, col));
        }
    }
    if !sent.is_empty() {
        info!(matched = sent.len(), "transcript matched cells on the card");
    }
    sent
}
