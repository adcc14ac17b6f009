//! Management API Tests
//!
//! The `/@connections/{id}` surface: push, inspect, close, and the Gone
//! behavior for sessions that no longer exist.

use std::time::Duration;

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use crate::common::{expect_close, TestApp, WAIT};

/// Poll a request until it answers 410, or fail after the shared deadline.
/// Teardown runs on the session task, so Gone can lag the close by a tick.
async fn wait_for_gone(send: impl Fn() -> reqwest::RequestBuilder) -> reqwest::Response {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let response = send().send().await.unwrap();
        if response.status() == 410 {
            return response;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("connection never became Gone; last status {}", response.status());
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn test_post_delivers_frame_to_client() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;
    let id = app.connection_id(0).await;

    let response = app
        .client
        .post(app.url(&format!("/@connections/{}", id)))
        .body("{\"k\":\"v\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    match ws.next().await {
        Some(Ok(Message::Text(text))) => assert_eq!(text, "{\"k\":\"v\"}"),
        other => panic!("expected text frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_post_after_close_is_gone() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;
    let id = app.connection_id(0).await;

    ws.close(None).await.unwrap();
    app.backend.wait_for("/disconnect", 1).await;

    let response = wait_for_gone(|| {
        app.client
            .post(app.url(&format!("/@connections/{}", id)))
            .body("{\"k\":\"v\"}")
    })
    .await;

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["message"], "Gone");
    assert_eq!(json["connectionId"], id);
}

#[tokio::test]
async fn test_get_connection_metadata() {
    let app = TestApp::spawn().await;
    let _ws = app.connect().await;
    let id = app.connection_id(0).await;

    let response = app
        .client
        .get(app.url(&format!("/@connections/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["connectionId"], id);

    let connected_at =
        chrono::DateTime::parse_from_rfc3339(json["connectedAt"].as_str().unwrap()).unwrap();
    let last_active =
        chrono::DateTime::parse_from_rfc3339(json["lastActiveAt"].as_str().unwrap()).unwrap();
    assert!(connected_at <= last_active);
}

#[tokio::test]
async fn test_management_push_counts_as_activity() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;
    let id = app.connection_id(0).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let response = app
        .client
        .post(app.url(&format!("/@connections/{}", id)))
        .body("nudge")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let _ = ws.next().await;

    let response = app
        .client
        .get(app.url(&format!("/@connections/{}", id)))
        .send()
        .await
        .unwrap();
    let json: serde_json::Value = response.json().await.unwrap();
    let connected_at =
        chrono::DateTime::parse_from_rfc3339(json["connectedAt"].as_str().unwrap()).unwrap();
    let last_active =
        chrono::DateTime::parse_from_rfc3339(json["lastActiveAt"].as_str().unwrap()).unwrap();
    assert!(last_active > connected_at);
}

#[tokio::test]
async fn test_delete_closes_with_1000() {
    let app = TestApp::spawn().await;
    let mut ws = app.connect().await;
    let id = app.connection_id(0).await;

    let response = app
        .client
        .delete(app.url(&format!("/@connections/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let (code, reason) = expect_close(&mut ws).await;
    assert_eq!(code, 1000);
    assert_eq!(reason, "Closed by management API");

    // An admin close still owes the backend a DISCONNECT
    let disconnect = app.backend.wait_for("/disconnect", 1).await.remove(0);
    assert_eq!(
        disconnect.json()["requestContext"]["disconnectStatusCode"],
        1000
    );

    // Closing twice is Gone, not an error
    let response = wait_for_gone(|| {
        app.client
            .delete(app.url(&format!("/@connections/{}", id)))
    })
    .await;
    assert_eq!(response.status(), 410);
}

#[tokio::test]
async fn test_unknown_connection_is_gone() {
    let app = TestApp::spawn().await;

    for request in [
        app.client.get(app.url("/@connections/missing00000=")),
        app.client
            .post(app.url("/@connections/missing00000="))
            .body("x"),
        app.client.delete(app.url("/@connections/missing00000=")),
    ] {
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), 410);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["message"], "Gone");
        assert_eq!(json["connectionId"], "missing00000=");
    }
}

#[tokio::test]
async fn test_other_methods_not_allowed() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .put(app.url("/@connections/missing00000="))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/@connections"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = app.client.get(app.url("/nope")).send().await.unwrap();
    assert_eq!(response.status(), 404);
}
