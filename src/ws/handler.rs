//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{ArenaHandle, ParticipantId};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = ParticipantId::new();
    info!(participant_id = %id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();

    if state.arena.connect(id, outbox_tx).await.is_err() {
        error!(participant_id = %id, "Arena is not running, closing connection");
        return;
    }

    let limiter = ConnectionRateLimiter::new(
        state.config.input_rate_limit,
        state.config.event_rate_limit,
    );
    run_session(id, ws_sink, ws_stream, outbox_rx, &state.arena, limiter).await;

    // Removal is broadcast by the arena
    let _ = state.arena.disconnect(id).await;

    info!(participant_id = %id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    id: ParticipantId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut outbox_rx: mpsc::UnboundedReceiver<ServerMsg>,
    arena: &ArenaHandle,
    limiter: ConnectionRateLimiter,
) {
    // Writer task: arena outbox -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(participant_id = %id, error = %e, "WebSocket send failed");
                break;
            }
        }
        debug!(participant_id = %id, "Outbox closed");
    });

    // Reader loop: WebSocket -> arena
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                match ClientMsg::decode(&text) {
                    Ok(msg) => {
                        let allowed = if msg.is_combat_event() {
                            limiter.check_event()
                        } else {
                            limiter.check_input()
                        };
                        if !allowed {
                            debug!(
                                participant_id = %id,
                                combat = msg.is_combat_event(),
                                "Rate limited inbound frame"
                            );
                            continue;
                        }

                        if arena.client(id, msg).await.is_err() {
                            debug!(participant_id = %id, "Arena channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(participant_id = %id, error = %e, "Dropped malformed frame");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(participant_id = %id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(participant_id = %id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(participant_id = %id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), SendError> {
    let json = msg.encode()?;
    sink.send(Message::Text(json)).await?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error(transparent)]
    Encode(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] axum::Error),
}
