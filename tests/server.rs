//! Integration tests for the arena server.
//!
//! These tests start a real server instance and connect via WebSocket
//! to verify end-to-end behavior.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use dodge_arena_server::app::AppState;
use dodge_arena_server::config::Config;
use dodge_arena_server::http::build_router;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A running server: its WebSocket address and a router sharing its state
struct TestServer {
    addr: SocketAddr,
    router: Router,
}

/// Start a test server on a random available port.
async fn start_test_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = Config {
        server_addr: addr,
        tick_interval: Duration::from_millis(10),
        // Slow spawns keep the start positions safe for the whole test
        spawn_interval: Duration::from_secs(30),
        rng_seed: Some(12345),
        ..Config::default()
    };

    let (state, sessions) = AppState::new(config);
    tokio::spawn(sessions.run());

    let router = build_router(state);
    let app = router.clone();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, router }
}

/// Connect and consume the welcome message. Returns the socket and own id.
async fn connect(addr: SocketAddr) -> (Ws, String) {
    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("Failed to connect");

    let (event, data) = recv_event(&mut ws).await;
    assert_eq!(event, "welcome");
    let id = data["id"].as_str().expect("welcome carries id").to_string();
    (ws, id)
}

async fn send_event(ws: &mut Ws, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    ws.send(Message::Text(frame)).await.unwrap();
}

/// Read the next event as (name, data).
async fn recv_event(ws: &mut Ws) -> (String, Value) {
    let next = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let value: Value =
                        serde_json::from_str(&text).expect("Failed to parse server message");
                    let event = value["event"].as_str().unwrap().to_string();
                    return (event, value["data"].clone());
                }
                Some(Ok(_)) => continue, // Skip ping/pong
                Some(Err(e)) => panic!("WebSocket error: {}", e),
                None => panic!("WebSocket closed unexpectedly"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(3), next)
        .await
        .expect("timed out waiting for server event")
}

/// Skip events until `event` arrives; returns its data.
async fn wait_for(ws: &mut Ws, event: &str) -> Value {
    loop {
        let (name, data) = recv_event(ws).await;
        if name == event {
            return data;
        }
    }
}

async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn health(router: &Router) -> Value {
    let (status, body) = get(router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).expect("health body is json")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_root_reports_liveness() {
    let server = start_test_server().await;
    let (status, body) = get(&server.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Dodge! multiplayer server is running");

    let health = health(&server.router).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["connections"], 0);
    assert_eq!(health["rooms"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_clients_get_unique_ids() {
    let server = start_test_server().await;
    let addr = server.addr;
    let (_ws1, id1) = connect(addr).await;
    let (_ws2, id2) = connect(addr).await;
    assert_ne!(id1, id2, "Each client should get a unique ID");
}

#[tokio::test]
async fn test_join_lobby_and_room_full() {
    let server = start_test_server().await;
    let addr = server.addr;
    let (mut ws1, id1) = connect(addr).await;
    let (mut ws2, id2) = connect(addr).await;
    let (mut ws3, id3) = connect(addr).await;

    send_event(&mut ws1, "joinLobby", json!({"mode": "advanced"})).await;
    assert_eq!(
        recv_event(&mut ws1).await,
        ("joined".to_string(), json!({"mode": "advanced"}))
    );
    let lobby = wait_for(&mut ws1, "lobby").await;
    assert_eq!(lobby["started"], false);
    assert_eq!(lobby["players"][&id1]["width"], 30.0);

    send_event(&mut ws2, "joinLobby", json!({"mode": "advanced"})).await;
    wait_for(&mut ws2, "joined").await;
    let lobby = wait_for(&mut ws1, "lobby").await;
    assert_eq!(lobby["players"].as_object().unwrap().len(), 2);
    assert!(lobby["players"].get(&id2).is_some());

    send_event(&mut ws3, "joinLobby", json!({"mode": "advanced"})).await;
    assert_eq!(
        recv_event(&mut ws3).await,
        ("room_full".to_string(), json!({"mode": "advanced"}))
    );

    let health = health(&server.router).await;
    let advanced = health["rooms"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["mode"] == "advanced")
        .unwrap();
    assert_eq!(advanced["players"], 2);
    assert_eq!(health["connections"], 3);
    assert!(!id3.is_empty());
}

#[tokio::test]
async fn test_unknown_mode_joins_normal_room() {
    let server = start_test_server().await;
    let addr = server.addr;
    let (mut ws, id) = connect(addr).await;

    send_event(&mut ws, "joinLobby", json!({"mode": "nightmare"})).await;
    let joined = wait_for(&mut ws, "joined").await;
    assert_eq!(joined["mode"], "normal");

    let lobby = wait_for(&mut ws, "lobby").await;
    assert_eq!(lobby["mode"], "normal");
    assert_eq!(lobby["players"][&id]["width"], 50.0);
}

#[tokio::test]
async fn test_malformed_messages_are_ignored() {
    let server = start_test_server().await;
    let addr = server.addr;
    let (mut ws, _) = connect(addr).await;

    ws.send(Message::Text("not json".to_string())).await.unwrap();
    send_event(&mut ws, "playerDied", json!({})).await;
    send_event(&mut ws, "joinLobby", json!({"mode": "normal"})).await;

    let (event, data) = recv_event(&mut ws).await;
    assert_eq!(event, "joined");
    assert_eq!(data["mode"], "normal");
}

#[tokio::test]
async fn test_full_match_flow_and_disconnect_win() {
    let server = start_test_server().await;
    let addr = server.addr;
    let (mut ws1, id1) = connect(addr).await;
    let (mut ws2, _id2) = connect(addr).await;

    for ws in [&mut ws1, &mut ws2] {
        send_event(ws, "joinLobby", json!({"mode": "normal"})).await;
        wait_for(ws, "joined").await;
    }
    for ws in [&mut ws1, &mut ws2] {
        send_event(ws, "setReady", json!({"mode": "normal", "ready": true})).await;
    }

    for ws in [&mut ws1, &mut ws2] {
        let start = wait_for(ws, "matchStart").await;
        assert_eq!(start["mode"], "normal");
        assert_eq!(start["players"].as_object().unwrap().len(), 2);
        assert_eq!(start["enemies"], json!([]));
    }

    // Moves are clamped into the arena
    send_event(&mut ws1, "playerMove", json!({"mode": "normal", "x": -50.0, "y": 200.0})).await;
    let mut clamped = false;
    for _ in 0..50 {
        let state = wait_for(&mut ws1, "stateUpdate").await;
        let me = &state["players"][&id1];
        if me["y"] == 200.0 {
            assert_eq!(me["x"], 0.0);
            clamped = true;
            break;
        }
    }
    assert!(clamped, "move never showed up in a state update");

    let health = health(&server.router).await;
    let normal = health["rooms"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["mode"] == "normal")
        .unwrap();
    assert_eq!(normal["started"], true);

    // Leaving mid-match hands the win to the other player
    ws1.close(None).await.unwrap();
    wait_for(&mut ws2, "you_won").await;
    assert_eq!(wait_for(&mut ws2, "matchOver").await, json!({}));

    // Room is back in its lobby and can be joined again
    let (mut ws3, _) = connect(addr).await;
    send_event(&mut ws3, "joinLobby", json!({"mode": "normal"})).await;
    wait_for(&mut ws3, "joined").await;
    let lobby = wait_for(&mut ws3, "lobby").await;
    assert_eq!(lobby["started"], false);
    let players = lobby["players"].as_object().unwrap();
    assert_eq!(players.len(), 2);
    assert!(players.values().all(|p| p["ready"] == false && p["alive"] == true));
}
