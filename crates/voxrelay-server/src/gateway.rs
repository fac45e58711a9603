//! WebSocket gateway: maps conversation cycles onto a persistent
//! bidirectional channel.
//!
//! Each connection gets its own [`ConversationSession`] and a single receive
//! loop that awaits one pipeline cycle at a time, so utterances are answered
//! strictly in arrival order. Outbound frames flow through a bounded mpsc
//! channel to a dedicated send task. Closing the socket ends the loop, which
//! drops the session and any in-flight cycle with it — a late upstream
//! result is discarded instead of being written to a torn-down session.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        ConnectInfo, Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;
use voxrelay_core::{ConversationSession, PipelineRequest, PipelineResult};

/// Maximum allowed length for an utterance (8 KiB). Anything a speech
/// recognizer finalizes fits well under this; oversized frames are rejected
/// with an error frame rather than forwarded upstream.
const MAX_UTTERANCE_LEN: usize = 8_192;

/// Outbound frame buffer per connection. Cycles are serialized, so this only
/// needs to absorb a slow reader for a handful of replies.
const OUTBOUND_BUFFER: usize = 32;

/// Incoming WebSocket frame types.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "utterance")]
    Utterance { text: String },
}

/// Outgoing WebSocket frame types.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "reply")]
    Reply {
        text: String,
        /// Base64-encoded MPEG audio; omitted for text-only replies.
        #[serde(skip_serializing_if = "Option::is_none")]
        audio: Option<String>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerFrame {
    fn reply(result: PipelineResult) -> Self {
        ServerFrame::Reply {
            text: result.text,
            audio: result
                .audio
                .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes)),
        }
    }
}

/// Sends a JSON-serialized frame over the connection's outbound channel.
/// Returns `false` when the connection is gone — delivery is skipped, never
/// retried.
async fn send_frame(tx: &mpsc::Sender<String>, frame: &ServerFrame) -> bool {
    match serde_json::to_string(frame) {
        Ok(json) => {
            if tx.send(json).await.is_err() {
                tracing::debug!("connection closed before delivery, skipping frame");
                return false;
            }
            true
        }
        Err(e) => {
            tracing::error!("failed to serialize outgoing frame: {}", e);
            false
        }
    }
}

/// WebSocket handler: `GET /ws`.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    tracing::info!(remote_addr = %addr, "websocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr))
}

/// Handles one WebSocket connection for its entire lifetime.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, addr: SocketAddr) {
    let session_id = Uuid::new_v4();
    tracing::info!(session_id = %session_id, remote_addr = %addr, "session opened");

    // Per-connection conversation state, seeded with the persona priming
    // pair. Dropped when this function returns; never shared.
    let mut session = ConversationSession::new(&state.priming);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(AxumMessage::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    let mut cycles: u64 = 0;
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            AxumMessage::Text(text) => {
                let frame = match serde_json::from_str::<ClientFrame>(text.as_str()) {
                    Ok(frame) => frame,
                    Err(_) => {
                        tracing::warn!(session_id = %session_id, "unparseable inbound frame");
                        send_frame(
                            &tx,
                            &ServerFrame::Error {
                                message: "invalid message format".to_string(),
                            },
                        )
                        .await;
                        continue;
                    }
                };

                let ClientFrame::Utterance { text } = frame;
                if text.len() > MAX_UTTERANCE_LEN {
                    send_frame(
                        &tx,
                        &ServerFrame::Error {
                            message: format!(
                                "utterance exceeds maximum length of {} bytes",
                                MAX_UTTERANCE_LEN
                            ),
                        },
                    )
                    .await;
                    continue;
                }

                // Awaiting the cycle here serializes this connection: a
                // second utterance waits in the socket buffer until the
                // first reply is queued, so replies keep arrival order.
                let result = state
                    .orchestrator
                    .run_cycle(&mut session, PipelineRequest { utterance: text })
                    .await;

                match result {
                    Some(result) => {
                        cycles += 1;
                        tracing::info!(
                            session_id = %session_id,
                            cycle = cycles,
                            has_audio = result.audio.is_some(),
                            "cycle delivered"
                        );
                        if !send_frame(&tx, &ServerFrame::reply(result)).await {
                            break;
                        }
                    }
                    // Empty utterance: no reply owed.
                    None => {}
                }
            }
            AxumMessage::Close(_) => break,
            // Pings are answered by axum; binary and pong frames carry
            // nothing for this protocol.
            _ => {}
        }
    }

    send_task.abort();
    tracing::info!(
        session_id = %session_id,
        remote_addr = %addr,
        cycles,
        history_len = session.len(),
        "session closed"
    );
}
