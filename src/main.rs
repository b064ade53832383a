//! Terminal client: joins a room, streams game events, takes simple commands.

use std::env;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meeting_bingo_client::{
    ClientConfig, ClientState, GameEvent, SharedState, services::controller,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut args = env::args().skip(1);
    let Some(meeting_id) = args.next() else {
        bail!("usage: meeting-bingo-client <meeting-id> [player-name]");
    };
    let player_name = args.next().unwrap_or_else(|| "anonymous".into());

    let config = ClientConfig::load();
    let state = ClientState::new(config).context("building client state")?;

    controller::join(&state, &meeting_id, &player_name)
        .await
        .context("joining room")?;
    println!("joined room {meeting_id} as {player_name}; type `help` for commands");

    let mut events = state.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event printer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    run_command_loop(&state).await?;

    printer.abort();
    if let Err(err) = controller::leave(&state).await {
        warn!(error = %err, "leave failed; local state cleared anyway");
    }
    Ok(())
}

/// Read stdin commands until `quit`, EOF, or Ctrl+C.
async fn run_command_loop(state: &SharedState) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else { break };
                if !handle_command(state, line.trim()).await {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Dispatch one command line; returns false when the loop should end.
async fn handle_command(state: &SharedState, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    match parts.next() {
        None => {}
        Some("quit") | Some("exit") => return false,
        Some("help") => {
            println!("commands:");
            println!("  mark <row> <col>   mark a cell (0-4)");
            println!("  say <text>         feed a transcript line");
            println!("  card               generate and push a new card");
            println!("  switch <meeting>   switch rooms");
            println!("  board              show the local card and roster");
            println!("  quit               leave and exit");
        }
        Some("mark") => {
            let row = parts.next().and_then(|value| value.parse().ok());
            let col = parts.next().and_then(|value| value.parse().ok());
            match (row, col) {
                (Some(row), Some(col)) => {
                    if let Err(err) = controller::mark_cell(state, row, col).await {
                        println!("mark failed: {err}");
                    }
                }
                _ => println!("usage: mark <row> <col>"),
            }
        }
        Some("say") => {
            let text = parts.collect::<Vec<_>>().join(" ");
            let marked = controller::ingest_transcript(state, &text).await;
            if !marked.is_empty() {
                println!("matched {} cell(s)", marked.len());
            }
        }
        Some("card") => match controller::new_card(state).await {
            Ok(grid) => {
                for row in grid.rows() {
                    println!("  {}", row.join(" | "));
                }
            }
            Err(err) => println!("new card failed: {err}"),
        },
        Some("switch") => match parts.next() {
            Some(meeting_id) => match controller::switch_room(state, meeting_id).await {
                Ok(true) => println!("switched to {meeting_id}"),
                Ok(false) => println!("already in {meeting_id}; switch debounced"),
                Err(err) => println!("switch failed: {err}"),
            },
            None => println!("usage: switch <meeting-id>"),
        },
        Some("board") => {
            if let Some(local) = state.local_player().await {
                println!(
                    "{}: {} marked{}",
                    local.player_name,
                    local.marked_cells.marked_count(),
                    if local.has_bingo { ", BINGO" } else { "" }
                );
            }
            for player in state.other_players().await {
                println!(
                    "{}: {} marked{}{}",
                    player.player_name,
                    player.marked_cells.marked_count(),
                    if player.has_bingo { ", BINGO" } else { "" },
                    if player.connected { "" } else { " (offline)" }
                );
            }
        }
        Some(other) => println!("unknown command `{other}`; try `help`"),
    }
    true
}

/// Render one domain event as a terminal line.
fn print_event(event: &GameEvent) {
    match event {
        GameEvent::PlayerJoined(player) => println!("* {} joined", player.player_name),
        GameEvent::PlayerLeft { player_name, .. } => println!("* {player_name} left"),
        GameEvent::PlayerUpdated(player) => println!(
            "* {} now has {} cells marked",
            player.player_name,
            player.marked_cells.marked_count()
        ),
        GameEvent::Bingo { player_name, .. } => println!("*** BINGO for {player_name} ***"),
        GameEvent::Transcript { text } => println!("~ {text}"),
        GameEvent::RosterSynced { count } => println!("* roster synced: {count} other player(s)"),
        GameEvent::RoomClosed { reason } => println!("* room closed: {reason}"),
        GameEvent::Error { message } => println!("! server error: {message}"),
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
