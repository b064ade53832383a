//! In-process game server for integration tests, speaking the same wire
//! protocol as the production backend.

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Json, Router,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::{delete, get, post},
};
use indexmap::IndexMap;
use tokio::{sync::broadcast, task::JoinHandle};

use crate::dto::{
    http::{JoinRequest, JoinResponse, MarkCellRequest, MarkCellResponse, RoomStateResponse},
    player::PlayerState,
    ws::{ClientMessage, ServerMessage},
};

/// A running stub server bound to an ephemeral local port.
pub struct StubServer {
    /// Address the server listens on.
    pub addr: SocketAddr,
    /// Shared bookkeeping the tests assert against.
    pub state: Arc<StubState>,
    /// Handle to the serve task; abort it to simulate an unreachable server.
    pub server: JoinHandle<()>,
}

/// Counters and room state shared between handlers and tests.
pub struct StubState {
    players: Mutex<IndexMap<String, PlayerState>>,
    next_player: AtomicUsize,
    /// Number of `POST /api/join` calls observed.
    pub join_calls: AtomicUsize,
    /// Number of `DELETE .../player/{id}` calls observed.
    pub leave_calls: AtomicUsize,
    /// Every word grid pushed via the words endpoint.
    pub words_pushes: Mutex<Vec<Vec<Vec<String>>>>,
    /// Marks received over REST.
    pub rest_marks: Mutex<Vec<(u8, u8)>>,
    /// Marks received over the socket.
    pub ws_marks: Mutex<Vec<(u8, u8)>>,
    push: broadcast::Sender<String>,
}

impl StubState {
    fn new() -> Self {
        let (push, _receiver) = broadcast::channel(32);
        Self {
            players: Mutex::new(IndexMap::new()),
            next_player: AtomicUsize::new(0),
            join_calls: AtomicUsize::new(0),
            leave_calls: AtomicUsize::new(0),
            words_pushes: Mutex::new(Vec::new()),
            rest_marks: Mutex::new(Vec::new()),
            ws_marks: Mutex::new(Vec::new()),
            push,
        }
    }

    /// Pre-seed another player into the room before the client joins.
    pub fn seed_player(&self, player: PlayerState) {
        self.players
            .lock()
            .unwrap()
            .insert(player.player_id.clone(), player);
    }

    /// Push a frame to every connected socket.
    pub fn push_message(&self, message: &ServerMessage) {
        self.push_raw(serde_json::to_string(message).unwrap());
    }

    /// Push a raw (possibly malformed) frame to every connected socket.
    pub fn push_raw(&self, frame: String) {
        let _ = self.push.send(frame);
    }

    fn roster_excluding(&self, player_id: &str) -> Vec<PlayerState> {
        self.players
            .lock()
            .unwrap()
            .values()
            .filter(|player| player.player_id != player_id)
            .cloned()
            .collect()
    }
}

impl StubServer {
    /// Bind an ephemeral port and serve the stub protocol on it.
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState::new());
        let app = Router::new()
            .route("/api/join", post(join))
            .route("/api/mark", post(mark))
            .route("/api/room/{meeting_id}", get(room))
            .route("/api/room/{meeting_id}/player/{player_id}/words", post(words))
            .route("/api/room/{meeting_id}/player/{player_id}", delete(leave))
            .route("/health", get(health))
            .route("/ws/{meeting_id}/{player_id}", get(ws_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL of the running stub.
    pub fn url(&self) -> url::Url {
        url::Url::parse(&format!("http://{}", self.addr)).unwrap()
    }
}

async fn join(
    State(stub): State<Arc<StubState>>,
    Json(request): Json<JoinRequest>,
) -> Json<JoinResponse> {
    stub.join_calls.fetch_add(1, Ordering::SeqCst);
    let number = stub.next_player.fetch_add(1, Ordering::SeqCst) + 1;
    let player_id = format!("stub{number}");

    let player = PlayerState::new(player_id.clone(), request.player_name);
    let players = stub.roster_excluding(&player_id);
    stub.players
        .lock()
        .unwrap()
        .insert(player_id.clone(), player);

    Json(JoinResponse {
        player_id,
        meeting_id: request.meeting_id,
        players,
    })
}

async fn words(
    State(stub): State<Arc<StubState>>,
    Path((_meeting_id, _player_id)): Path<(String, String)>,
    Json(rows): Json<Vec<Vec<String>>>,
) -> Json<serde_json::Value> {
    stub.words_pushes.lock().unwrap().push(rows);
    Json(serde_json::json!({"status": "ok"}))
}

async fn mark(
    State(stub): State<Arc<StubState>>,
    Json(request): Json<MarkCellRequest>,
) -> Json<MarkCellResponse> {
    stub.rest_marks
        .lock()
        .unwrap()
        .push((request.row, request.col));
    Json(MarkCellResponse {
        status: "ok".into(),
        has_bingo: false,
    })
}

async fn room(
    State(stub): State<Arc<StubState>>,
    Path(meeting_id): Path<String>,
) -> Json<RoomStateResponse> {
    let players: Vec<PlayerState> = stub.players.lock().unwrap().values().cloned().collect();
    let player_count = players.len();
    Json(RoomStateResponse {
        meeting_id,
        players,
        player_count,
    })
}

async fn health(State(stub): State<Arc<StubState>>) -> Json<serde_json::Value> {
    let rooms = usize::from(!stub.players.lock().unwrap().is_empty());
    Json(serde_json::json!({"status": "healthy", "rooms": rooms}))
}

async fn leave(
    State(stub): State<Arc<StubState>>,
    Path((_meeting_id, player_id)): Path<(String, String)>,
) -> Json<serde_json::Value> {
    stub.leave_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(player) = stub.players.lock().unwrap().get_mut(&player_id) {
        player.connected = false;
    }
    Json(serde_json::json!({"status": "ok"}))
}

async fn ws_handler(
    State(stub): State<Arc<StubState>>,
    Path((_meeting_id, player_id)): Path<(String, String)>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(stub, socket, player_id))
}

async fn serve_socket(stub: Arc<StubState>, mut socket: WebSocket, player_id: String) {
    let sync = ServerMessage::Sync {
        players: stub.roster_excluding(&player_id),
    };
    if socket
        .send(Message::Text(
            serde_json::to_string(&sync).unwrap().into(),
        ))
        .await
        .is_err()
    {
        return;
    }

    let mut push = stub.push.subscribe();
    loop {
        tokio::select! {
            frame = push.recv() => match frame {
                Ok(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    handle_inbound(&stub, &mut socket, &player_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }
}

async fn handle_inbound(
    stub: &Arc<StubState>,
    socket: &mut WebSocket,
    player_id: &str,
    raw: &str,
) {
    let Ok(message) = serde_json::from_str::<ClientMessage>(raw) else {
        return;
    };
    match message {
        ClientMessage::MarkCell { row, col } => {
            stub.ws_marks.lock().unwrap().push((row, col));
            let updated = {
                let mut players = stub.players.lock().unwrap();
                let Some(player) = players.get_mut(player_id) else {
                    return;
                };
                player.marked_cells.mark(row.into(), col.into());
                player.has_bingo = player.marked_cells.has_bingo();
                player.clone()
            };
            let echo = ServerMessage::PlayerUpdated { player: updated };
            let _ = socket
                .send(Message::Text(
                    serde_json::to_string(&echo).unwrap().into(),
                ))
                .await;
        }
        ClientMessage::Ping => {
            let _ = socket
                .send(Message::Text(
                    serde_json::to_string(&ServerMessage::Pong).unwrap().into(),
                ))
                .await;
        }
    }
}
