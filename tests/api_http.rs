// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use econ_calendar_bot::api::LIVENESS_BODY;
use econ_calendar_bot::config::BotConfig;
use econ_calendar_bot::{build_engine, build_router, Broadcaster, ChannelId};
use serde_json::json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt as _; // for `oneshot`

const BODY_LIMIT: usize = 64 * 1024;

struct Silent;

#[async_trait::async_trait]
impl Broadcaster for Silent {
    async fn list_channels(&self) -> anyhow::Result<Vec<ChannelId>> {
        Ok(vec![])
    }
    async fn send(&self, _channel: &ChannelId, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

fn test_router(relay_token: Option<&str>) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cfg = BotConfig {
        cache_path: dir.path().join("cached_events.json"),
        feed_url: "http://127.0.0.1:9/unused.json".into(),
        command_relay_token: relay_token.map(str::to_string),
        ..BotConfig::default()
    };
    let engine = build_engine(&cfg, Arc::new(Silent)).expect("engine");
    (build_router(&cfg, engine), dir)
}

async fn body_string(resp: shuttle_axum::axum::response::Response) -> String {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    String::from_utf8(bytes).expect("utf8")
}

fn command(content: &str, auth: Option<&str>) -> Request<Body> {
    let mut b = Request::builder()
        .method("POST")
        .uri("/commands")
        .header("content-type", "application/json");
    if let Some(a) = auth {
        b = b.header("authorization", a);
    }
    b.body(Body::from(
        json!({ "channel_id": "1", "content": content, "author_is_bot": false }).to_string(),
    ))
    .expect("build POST /commands")
}

#[tokio::test]
async fn liveness_root_returns_fixed_body() {
    let (app, _dir) = test_router(None);
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.expect("oneshot /");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, LIVENESS_BODY);
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _dir) = test_router(None);
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await.trim(), "ok");
}

#[tokio::test]
async fn unknown_chatter_is_ignored() {
    let (app, _dir) = test_router(None);
    let resp = app.oneshot(command("good morning", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn recognised_command_is_accepted() {
    let (app, _dir) = test_router(None);
    let resp = app.oneshot(command("!weeklyevents", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn relay_token_is_enforced() {
    let (app, _dir) = test_router(Some("s3cret"));
    let resp = app
        .clone()
        .oneshot(command("!dailyevents", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(command("!dailyevents", Some("Bearer s3cret")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}
