//! WebSocket chat transport.
//!
//! Each connection owns one [`Session`]. Frames from a connection are handled
//! in order, so a connection never has two turns in flight. Replies go to the
//! asking connection only; task list updates go to everyone.

use crate::app::AppState;
use crate::messages::{ClientMessage, GENERIC_ERROR, ServerMessage};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use taskmate_conversation::Session;
use taskmate_core::ConnectionId;
use tracing::{debug, error, info, warn};

/// Upgrades `GET /ws` to a chat connection.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one connection until either side closes.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (connection_id, mut outbound) = state.connections.connect().await;
    info!(connection_id = %connection_id, "client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if let Err(e) = send_message(&mut sender, &message).await {
                debug!(connection_id = %connection_id, error = %e, "send failed, closing");
                break;
            }
        }
    });

    let mut recv_task = {
        let state = state.clone();
        tokio::spawn(async move {
            let mut session = Session::new(state.agent.clone());
            debug!(
                connection_id = %connection_id,
                session_id = %session.id(),
                "session opened"
            );

            while let Some(result) = receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        handle_frame(&state, connection_id, &mut session, text.as_str()).await;
                    }
                    Ok(Message::Binary(_)) => {
                        warn!(connection_id = %connection_id, "binary frame rejected");
                        state
                            .connections
                            .send(
                                connection_id,
                                ServerMessage::error("Binary frames are not supported."),
                            )
                            .await;
                    }
                    Ok(Message::Close(_)) => {
                        debug!(connection_id = %connection_id, "client sent close frame");
                        break;
                    }
                    // Ping and pong are answered by axum.
                    Ok(_) => {}
                    Err(e) => {
                        debug!(connection_id = %connection_id, error = %e, "receive failed");
                        break;
                    }
                }
            }
        })
    };

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.connections.disconnect(connection_id).await;
    info!(connection_id = %connection_id, "client disconnected");
}

async fn handle_frame(
    state: &AppState,
    connection_id: ConnectionId,
    session: &mut Session,
    text: &str,
) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(connection_id = %connection_id, error = %e, "malformed frame");
            state
                .connections
                .send(connection_id, ServerMessage::error(format!("Invalid message: {e}")))
                .await;
            return;
        }
    };

    match message {
        ClientMessage::ChatMessage { content } => {
            chat(state, connection_id, session, &content).await;
        }
        ClientMessage::ClearHistory => {
            session.clear_history();
            state
                .connections
                .send(connection_id, ServerMessage::HistoryCleared)
                .await;
        }
    }
}

async fn chat(state: &AppState, connection_id: ConnectionId, session: &mut Session, content: &str) {
    let summary = match session.submit(content).await {
        Ok(summary) => summary,
        Err(report) => {
            error!(
                connection_id = %connection_id,
                session_id = %session.id(),
                error = %report,
                "turn failed"
            );
            state
                .connections
                .send(connection_id, ServerMessage::error(GENERIC_ERROR))
                .await;
            return;
        }
    };

    let reply = ServerMessage::agent(Session::render_final_text(&summary.outcome));
    state.connections.send(connection_id, reply).await;

    if summary.records_mutated {
        broadcast_task_list(state).await;
    }
}

async fn broadcast_task_list(state: &AppState) {
    match state.store.list().await {
        Ok(tasks) => {
            let count = tasks.len();
            let reached = state
                .connections
                .broadcast(&ServerMessage::TaskListUpdate { tasks })
                .await;
            debug!(tasks = count, connections = reached, "task list broadcast");
        }
        Err(e) => {
            error!(error = %e, "failed to reload tasks for broadcast");
        }
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "failed to serialize server message");
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await
}
