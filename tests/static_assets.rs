mod support;

use std::sync::Arc;

use assistant_relay::server::router;
use assistant_relay::store::providers::MemoryRecordStore;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use support::{StubAssistant, test_config, test_state};

struct RawResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

async fn get(path: &str) -> RawResponse {
    let state = test_state(
        Arc::new(StubAssistant::new()),
        Arc::new(MemoryRecordStore::new()),
        test_config(),
    );
    let request = Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("request should build");

    let response = router(state)
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");

    RawResponse {
        status,
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

#[tokio::test]
async fn test_root_serves_chat_page() {
    let response = get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response
            .content_type
            .as_deref()
            .is_some_and(|value| value.starts_with("text/html"))
    );
    assert!(response.body.contains(r#"id="chat-input""#));
    assert!(response.body.contains("script.js"));
}

#[tokio::test]
async fn test_widget_script_is_served() {
    let response = get("/script.js").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body.is_empty());
}

#[tokio::test]
async fn test_unknown_asset_is_not_found() {
    let response = get("/missing.css").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
