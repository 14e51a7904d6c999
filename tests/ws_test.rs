//! End-to-end tests over a real socket

use collabdoc::api;
use collabdoc::state::AppState;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tower_http::cors::CorsLayer;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_server() -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::in_memory());
    let app = api::router(state.clone(), CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

async fn connect(addr: SocketAddr, path: &str) -> Socket {
    let (socket, _) = connect_async(format!("ws://{}{}", addr, path))
        .await
        .expect("handshake should succeed");
    socket
}

async fn send(socket: &mut Socket, msg: Value) {
    socket.send(Message::text(msg.to_string())).await.unwrap();
}

enum Frame {
    Json(Value),
    Close(Option<u16>),
}

async fn next_frame(socket: &mut Socket) -> Frame {
    loop {
        let msg = tokio::time::timeout(TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for a frame");
        match msg {
            Some(Ok(Message::Text(text))) => {
                return Frame::Json(serde_json::from_str(text.as_str()).unwrap())
            }
            Some(Ok(Message::Close(frame))) => return Frame::Close(frame.map(|f| u16::from(f.code))),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return Frame::Close(None),
        }
    }
}

/// Read frames until one of the given type arrives
async fn expect_type(socket: &mut Socket, kind: &str) -> Value {
    loop {
        match next_frame(socket).await {
            Frame::Json(v) if v["type"] == kind => return v,
            Frame::Json(_) => continue,
            Frame::Close(code) => panic!("closed ({:?}) while waiting for {}", code, kind),
        }
    }
}

async fn wait_for_connections(state: &AppState, expected: usize) {
    tokio::time::timeout(TIMEOUT, async {
        while state.registry.stats().connections != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("registry did not settle");
}

#[tokio::test]
async fn test_edit_reaches_other_client_over_socket() {
    let (addr, state) = spawn_server().await;
    let mut a = connect(addr, "/ws/editor/doc1").await;
    let mut b = connect(addr, "/ws/editor/doc1").await;

    send(&mut a, json!({"type": "join", "payload": {"documentId": "doc1", "username": "alice"}}))
        .await;
    let initial = expect_type(&mut a, "initial_data").await;
    assert_eq!(initial["payload"]["collaborators"], json!(["alice"]));

    send(&mut b, json!({"type": "join", "payload": {"documentId": "doc1", "username": "bob"}}))
        .await;
    expect_type(&mut b, "initial_data").await;
    let update = expect_type(&mut a, "collaborators_update").await;
    let update = if update["payload"]["collaborators"] == json!(["alice"]) {
        expect_type(&mut a, "collaborators_update").await
    } else {
        update
    };
    assert_eq!(update["payload"]["collaborators"], json!(["alice", "bob"]));

    send(&mut a, json!({"type": "edit", "payload": {"documentId": "doc1", "content": "hi"}}))
        .await;
    let edit = expect_type(&mut b, "content_update").await;
    assert_eq!(edit["payload"], json!({"content": "hi", "editor": "alice"}));

    a.close(None).await.unwrap();
    let update = expect_type(&mut b, "collaborators_update").await;
    assert_eq!(update["payload"]["collaborators"], json!(["bob"]));

    wait_for_connections(&state, 1).await;
}

#[tokio::test]
async fn test_missing_document_id_is_closed_with_invalid_data() {
    let (addr, state) = spawn_server().await;
    let mut socket = connect(addr, "/ws/editor/").await;

    match next_frame(&mut socket).await {
        Frame::Close(code) => assert_eq!(code, Some(1007)),
        Frame::Json(v) => panic!("expected close, got {}", v),
    }
    wait_for_connections(&state, 0).await;
    assert_eq!(state.registry.stats().documents, 0);
}

#[tokio::test]
async fn test_empty_username_gets_error_then_close() {
    let (addr, state) = spawn_server().await;
    let mut socket = connect(addr, "/ws/editor/doc1").await;

    send(&mut socket, json!({"type": "join", "payload": {"documentId": "doc1", "username": ""}}))
        .await;

    match next_frame(&mut socket).await {
        Frame::Json(v) => {
            assert_eq!(v["type"], "error");
            assert_eq!(v["payload"]["message"], "Username is required to join.");
        }
        Frame::Close(code) => panic!("expected error first, got close {:?}", code),
    }
    match next_frame(&mut socket).await {
        Frame::Close(code) => assert_eq!(code, Some(1002)),
        Frame::Json(v) => panic!("expected close, got {}", v),
    }

    wait_for_connections(&state, 0).await;
    assert!(!state.registry.is_active("doc1"));
}
