//! The `/ws/voice` session loop.
//!
//! Protocol, from the browser's side: stream binary PCM16 frames while the
//! user speaks, then send one zero-length binary frame to close the turn.
//! The server answers each turn with `kb_result` JSON text messages and raw
//! PCM16 binary audio, in pipeline order. Turns are processed one at a time;
//! frames for the next turn queue in the websocket while the current turn
//! runs.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use parlor_voice::{ClientFrame, ClientSink, Turn, TurnBuffer};
use std::sync::Arc;
use uuid::Uuid;

/// Frames buffered between the pipeline and the socket writer. Large enough
/// to absorb synthesis bursts without stalling the relay.
const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// Upgrades `/ws/voice` requests into a voice session.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one voice session to completion.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut session = Uuid::new_v4().simple().to_string();
    session.truncate(8);
    tracing::info!(session = %session, "voice session opened");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Single writer task owns the socket sender; frame order on the wire is
    // the order frames enter the sink.
    let (sink, mut outbound) = ClientSink::channel(OUTBOUND_CHANNEL_CAPACITY);
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let message = match frame {
                ClientFrame::Text(json) => AxumMessage::Text(json.into()),
                ClientFrame::Audio(pcm) => AxumMessage::Binary(pcm.into()),
            };
            if ws_sender.send(message).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    state.pipeline.greet(&sink).await;

    let mut buffer = TurnBuffer::new();
    while let Some(message) = ws_receiver.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(session = %session, "websocket receive error: {}", e);
                break;
            }
        };

        match message {
            AxumMessage::Binary(bytes) if bytes.is_empty() => {
                let audio = buffer.drain();
                if audio.is_empty() {
                    tracing::debug!(session = %session, "turn boundary with no audio, ignored");
                    continue;
                }
                let turn = Turn::new(audio);
                state.pipeline.run_turn(turn, &sink).await;
            }
            AxumMessage::Binary(bytes) => {
                buffer.append(bytes.to_vec());
            }
            AxumMessage::Text(_) => {
                tracing::debug!(session = %session, "ignoring text frame on voice socket");
            }
            AxumMessage::Close(_) => break,
            AxumMessage::Ping(_) | AxumMessage::Pong(_) => {}
        }
    }

    // Dropping the sink ends the writer once queued frames have flushed.
    drop(sink);
    if let Err(e) = writer.await {
        tracing::debug!(session = %session, "writer task join error: {}", e);
    }
    tracing::info!(session = %session, "voice session closed");
}
