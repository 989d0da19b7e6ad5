//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::ConnectionId;
use crate::session::OUTBOUND_QUEUE;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<ServerMsg>(OUTBOUND_QUEUE);

    if !state.sessions.connect(conn_id, out_tx).await {
        error!(conn_id = %conn_id, "Session service unavailable");
        return;
    }

    run_session(conn_id, ws_sink, ws_stream, out_rx, &state).await;

    // Cleanup on disconnect
    state.sessions.disconnect(conn_id).await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    conn_id: ConnectionId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut out_rx: mpsc::Receiver<ServerMsg>,
    state: &AppState,
) {
    // Writer task: session service -> WebSocket.
    // Ends when the service drops this connection's sender.
    let mut writer_handle = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    // Reader loop: WebSocket -> session service
    let reader = async {
        while let Some(result) = ws_stream.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => {
                        if !state.sessions.client_msg(conn_id, client_msg).await {
                            debug!(conn_id = %conn_id, "Session channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                    }
                },
                Ok(Message::Binary(_)) => {
                    warn!(conn_id = %conn_id, "Received binary message, ignoring");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    info!(conn_id = %conn_id, "Client initiated close");
                    break;
                }
                Err(e) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = reader => {}
        _ = &mut writer_handle => {
            debug!(conn_id = %conn_id, "Writer finished, ending session");
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}
