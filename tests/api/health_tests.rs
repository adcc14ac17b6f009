//! Health Check API Tests

use crate::common::TestApp;

#[tokio::test]
async fn test_health_reports_ok() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["connections"], 0);
    assert!(json["uptime"].as_u64().is_some());
}

#[tokio::test]
async fn test_health_counts_live_sessions_and_stays_idempotent() {
    let app = TestApp::spawn().await;
    let _ws = app.connect().await;
    app.backend.wait_for("/connect", 1).await;

    for _ in 0..3 {
        let response = app.client.get(app.url("/health")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["connections"], 1);
    }
}
