//! End-to-End Gateway Tests
//!
//! Drive real WebSocket clients against an embedded emulator and assert on
//! the events the mock backend receives.

use std::time::Duration;

use chrono::DateTime;
use futures::SinkExt;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use gateway_emulator::config::IntegrationMode;

use crate::common::{expect_close, expect_no_frame, TestApp};

fn assert_connection_id_shape(id: &str) {
    assert_eq!(id.len(), 13, "connection id {:?} has wrong length", id);
    assert!(id.ends_with('='));
    assert!(id[..12].chars().all(|c| c.is_ascii_alphanumeric()));
}

#[tokio::test]
async fn test_connect_event_shape() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect_with("/?token=abc&id=7").await;

    let event = app.backend.wait_for("/connect", 1).await.remove(0);
    let json = event.json();
    let ctx = &json["requestContext"];

    assert_eq!(ctx["routeKey"], "$connect");
    assert_eq!(ctx["eventType"], "CONNECT");
    assert_eq!(ctx["messageDirection"], "IN");
    assert_eq!(ctx["stage"], "test");
    assert_eq!(ctx["apiId"], "test-api");
    assert_eq!(ctx["domainName"], format!("localhost:{}", app.addr.port()));
    assert_eq!(ctx["identity"]["sourceIp"], "127.0.0.1");
    assert_eq!(ctx["requestId"], ctx["extendedRequestId"]);
    assert_connection_id_shape(ctx["connectionId"].as_str().unwrap());

    // Event time agrees with the formatted request time
    let epoch = ctx["requestTimeEpoch"].as_i64().unwrap();
    let parsed = DateTime::parse_from_str(
        ctx["requestTime"].as_str().unwrap(),
        "%d/%b/%Y:%H:%M:%S %z",
    )
    .expect("requestTime must be DD/Mon/YYYY:HH:MM:SS +0000");
    assert!((parsed.timestamp_millis() - epoch).abs() < 2_000);
    assert!(ctx["connectedAt"].as_i64().unwrap() <= epoch);

    assert_eq!(json["body"], serde_json::Value::Null);
    assert_eq!(json["isBase64Encoded"], false);
    assert_eq!(json["queryStringParameters"]["token"], "abc");
    assert_eq!(json["queryStringParameters"]["id"], "7");

    // multiValueHeaders mirror headers as one-element arrays
    let host = json["headers"]["host"].as_str().unwrap().to_string();
    assert_eq!(json["multiValueHeaders"]["host"], serde_json::json!([host]));

    // The client sees nothing on a successful connect
    expect_no_frame(&mut ws, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_no_query_parameters_are_null() {
    let app = TestApp::spawn().await;
    let _ws = app.connect().await;

    let event = app.backend.wait_for("/connect", 1).await.remove(0);
    assert_eq!(event.json()["queryStringParameters"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_rejected_connect_closes_with_1011() {
    let app = TestApp::spawn().await;
    app.backend.respond_with("/connect", 500);

    let mut ws = app.connect().await;
    let (code, reason) = expect_close(&mut ws).await;
    assert_eq!(code, 1011);
    assert_eq!(reason, "Backend connect failed");

    // No $disconnect is owed for a session that was never admitted
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(app.backend.recorded_for("/disconnect").is_empty());
}

#[tokio::test]
async fn test_route_selection_expression() {
    let app = TestApp::spawn_with(|settings, backend| {
        settings.gateway.route_selection_expression = Some("$request.body.action".into());
        settings
            .integrations
            .insert("join".into(), backend.uri("/join"));
    })
    .await;

    let mut ws = app.connect().await;
    app.backend.wait_for("/connect", 1).await;

    ws.send(Message::Text("{\"action\":\"join\",\"roomId\":\"123\"}".into()))
        .await
        .unwrap();

    let event = app.backend.wait_for("/join", 1).await.remove(0);
    let json = event.json();
    assert_eq!(json["requestContext"]["routeKey"], "join");
    assert_eq!(json["requestContext"]["eventType"], "MESSAGE");
    assert_eq!(json["body"], "{\"action\":\"join\",\"roomId\":\"123\"}");
    assert!(!json["requestContext"]["messageId"]
        .as_str()
        .unwrap()
        .is_empty());

    // The matched route swallows the message; $default sees nothing
    assert!(app.backend.recorded_for("/default").is_empty());
}

#[tokio::test]
async fn test_unmatched_action_falls_back_to_default() {
    let app = TestApp::spawn_with(|settings, backend| {
        settings.gateway.route_selection_expression = Some("$request.body.action".into());
        settings
            .integrations
            .insert("join".into(), backend.uri("/join"));
    })
    .await;

    let mut ws = app.connect().await;
    app.backend.wait_for("/connect", 1).await;

    ws.send(Message::Text("{\"action\":\"leave\"}".into()))
        .await
        .unwrap();
    ws.send(Message::Text("not json".into())).await.unwrap();

    let events = app.backend.wait_for("/default", 2).await;
    assert_eq!(events[0].json()["requestContext"]["routeKey"], "$default");
    assert!(app.backend.recorded_for("/join").is_empty());
}

#[tokio::test]
async fn test_message_round_trip_is_verbatim() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;
    app.backend.wait_for("/connect", 1).await;

    ws.send(Message::Text("hello world".into())).await.unwrap();
    let event = app.backend.wait_for("/default", 1).await.remove(0);
    assert_eq!(event.json()["body"], "hello world");

    // Binary frames are surfaced as decoded text
    ws.send(Message::Binary(b"binary text".to_vec()))
        .await
        .unwrap();
    let event = app.backend.wait_for("/default", 2).await.remove(1);
    assert_eq!(event.json()["body"], "binary text");
}

#[tokio::test]
async fn test_events_are_ordered_per_session() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;
    app.backend.wait_for("/connect", 1).await;

    for frame in ["f1", "f2", "f3"] {
        ws.send(Message::Text(frame.into())).await.unwrap();
    }
    app.backend.wait_for("/default", 3).await;

    ws.close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "bye".into(),
    }))
    .await
    .unwrap();

    let disconnect = app.backend.wait_for("/disconnect", 1).await.remove(0);
    let ctx = disconnect.json();
    assert_eq!(ctx["requestContext"]["eventType"], "DISCONNECT");
    assert_eq!(ctx["requestContext"]["disconnectStatusCode"], 1000);
    assert_eq!(ctx["requestContext"]["disconnectReason"], "bye");

    // Connect first, messages in send order, disconnect last
    let paths: Vec<String> = app.backend.recorded().iter().map(|r| r.path.clone()).collect();
    assert_eq!(
        paths,
        vec!["/connect", "/default", "/default", "/default", "/disconnect"]
    );
    let bodies: Vec<serde_json::Value> = app
        .backend
        .recorded_for("/default")
        .iter()
        .map(|r| r.json()["body"].clone())
        .collect();
    assert_eq!(bodies, vec!["f1", "f2", "f3"]);
}

#[tokio::test]
async fn test_idle_timeout_closes_session() {
    let app = TestApp::spawn_with(|settings, _| {
        settings.gateway.idle_timeout_secs = 1;
        settings.gateway.hard_timeout_secs = 10;
    })
    .await;

    let mut ws = app.connect().await;
    app.backend.wait_for("/connect", 1).await;

    // Activity inside the window restarts the clock
    tokio::time::sleep(Duration::from_millis(600)).await;
    ws.send(Message::Text("still here".into())).await.unwrap();

    let start = std::time::Instant::now();
    let (code, reason) = expect_close(&mut ws).await;
    assert_eq!(code, 1001);
    assert_eq!(reason, "Idle timeout");
    // Closed roughly one idle window after the last frame
    assert!(start.elapsed() >= Duration::from_millis(500));

    let disconnect = app.backend.wait_for("/disconnect", 1).await.remove(0);
    assert_eq!(
        disconnect.json()["requestContext"]["disconnectStatusCode"],
        1001
    );
}

#[tokio::test]
async fn test_hard_timeout_ignores_activity() {
    let app = TestApp::spawn_with(|settings, _| {
        settings.gateway.idle_timeout_secs = 10;
        settings.gateway.hard_timeout_secs = 2;
    })
    .await;

    let mut ws = app.connect().await;
    app.backend.wait_for("/connect", 1).await;

    // Keep the session busy; the hard clock must not care
    let start = std::time::Instant::now();
    let (code, reason) = loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(300)) => {
                let _ = ws.send(Message::Text("ping".into())).await;
            }
            frame = futures::StreamExt::next(&mut ws) => match frame {
                Some(Ok(Message::Close(Some(close)))) => {
                    break (u16::from(close.code), close.reason.to_string());
                }
                Some(Ok(_)) => {}
                _ => break (1006, String::new()),
            },
        }
        assert!(
            start.elapsed() < Duration::from_secs(8),
            "hard timeout never fired"
        );
    };

    assert_eq!(code, 1001);
    assert_eq!(reason, "Connection lifetime exceeded");
    assert!(start.elapsed() >= Duration::from_millis(1500));
    assert!(start.elapsed() < Duration::from_secs(5));

    // Activity did flow while the session was alive
    assert!(!app.backend.recorded_for("/default").is_empty());
}

#[tokio::test]
async fn test_http_headers_mode() {
    let app = TestApp::spawn_with(|settings, _| {
        settings.gateway.integration_mode = IntegrationMode::HttpHeaders;
    })
    .await;

    let mut ws = app.connect_with("/?token=abc").await;

    let connect = app.backend.wait_for("/connect", 1).await.remove(0);
    assert_eq!(connect.body, "");
    assert_eq!(connect.query.as_deref(), Some("token=abc"));
    assert_eq!(connect.header("x-event-type"), Some("CONNECT"));
    assert_eq!(connect.header("x-route-key"), Some("$connect"));
    assert_connection_id_shape(connect.header("connectionid").unwrap());

    // JSON bodies travel as application/json, everything else as text
    ws.send(Message::Text("{\"a\":1}".into())).await.unwrap();
    let message = app.backend.wait_for("/default", 1).await.remove(0);
    assert_eq!(message.body, "{\"a\":1}");
    assert_eq!(message.header("x-event-type"), Some("MESSAGE"));
    assert_eq!(message.header("content-type"), Some("application/json"));

    ws.send(Message::Text("plain words".into())).await.unwrap();
    let message = app.backend.wait_for("/default", 2).await.remove(1);
    assert_eq!(message.body, "plain words");
    assert_eq!(message.header("content-type"), Some("text/plain"));
}

#[tokio::test]
async fn test_graceful_shutdown_closes_sessions_without_disconnect() {
    let mut app = TestApp::spawn().await;
    let mut ws = app.connect().await;
    app.backend.wait_for("/connect", 1).await;

    app.stop();
    let (code, reason) = expect_close(&mut ws).await;
    assert_eq!(code, 1001);
    assert_eq!(reason, "Server shutting down");

    // Shutdown closes do not owe the backend a DISCONNECT
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(app.backend.recorded_for("/disconnect").is_empty());
}

#[tokio::test]
async fn test_concurrent_sessions_have_distinct_ids() {
    let app = TestApp::spawn().await;
    let _ws1 = app.connect().await;
    let _ws2 = app.connect().await;

    let events = app.backend.wait_for("/connect", 2).await;
    let id0 = events[0].json()["requestContext"]["connectionId"]
        .as_str()
        .unwrap()
        .to_string();
    let id1 = events[1].json()["requestContext"]["connectionId"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(id0, id1);
    assert_connection_id_shape(&id0);
    assert_connection_id_shape(&id1);
}
