pub mod connection;
pub mod handlers;

pub use connection::{Connection, Outbound};

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::Uri,
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;

use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    uri: Uri,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: path={}", uri.path());

    let path = uri.path().to_string();
    ws.on_upgrade(move |socket| handle_socket(socket, path, state))
}

/// Drive one WebSocket: inbound frames go to the handlers, the connection's
/// outbound queue is written to the socket. This loop is the only writer.
async fn handle_socket(socket: WebSocket, path: String, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (conn, mut outbound) = Connection::new(state.outbound_capacity);

    // A bad path queues a close frame, which ends the loop below
    let _ = handlers::on_connect(&state, &conn, &path);

    let reason = loop {
        tokio::select! {
            frame = outbound.recv() => {
                match frame {
                    Some(Outbound::Text(text)) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break "send failed".to_string();
                        }
                    }
                    Some(Outbound::Close { code, reason }) => {
                        let close = close_message(code, &reason);
                        let _ = sender.send(close).await;
                        break format!("closed by server ({}: {})", code, reason);
                    }
                    None => break "outbound queue closed".to_string(),
                }
            }

            _ = conn.evicted() => {
                if let Outbound::Close { code, reason } = connection::eviction_frame() {
                    let _ = sender.send(close_message(code, &reason)).await;
                }
                break "evicted: outbound queue full".to_string();
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text.as_str());
                        handlers::on_message(&state, &conn, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(f) => format!("client closed ({}: {})", f.code, f.reason.as_str()),
                            None => "client closed".to_string(),
                        };
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break "pong failed".to_string();
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break format!("transport error: {}", e);
                    }
                    None => break "connection dropped".to_string(),
                }
            }
        }
    };

    handlers::on_disconnect(&state, &conn, &reason);
}

fn close_message(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }))
}
