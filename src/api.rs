use shuttle_axum::axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::commands::{CommandRouter, InboundMessage};

pub const LIVENESS_BODY: &str = "econ-calendar-bot is running";

#[derive(Clone)]
pub struct AppState {
    pub commands: CommandRouter,
    /// When set, `/commands` requires `Authorization: Bearer <token>`.
    pub relay_token: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { LIVENESS_BODY }))
        .route("/health", get(|| async { "ok" }))
        .route("/commands", post(relay_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn authorized(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(token) = expected else {
        return true;
    };
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|v| v.trim() == token)
}

/// Gateway adapters forward every chat message here. Recognised commands are
/// answered in the background; the caller only learns whether we took it.
async fn relay_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(msg): Json<InboundMessage>,
) -> StatusCode {
    if !authorized(state.relay_token.as_deref(), &headers) {
        return StatusCode::UNAUTHORIZED;
    }
    if CommandRouter::recognize(&msg).is_none() {
        return StatusCode::NO_CONTENT;
    }

    let router = state.commands.clone();
    tokio::spawn(async move {
        if let Some(report) = router.handle(&msg).await {
            if !report.is_clean() {
                tracing::warn!(channel = %msg.channel_id, "command reply not delivered");
            }
        }
    });
    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuttle_axum::axum::http::HeaderValue;

    #[test]
    fn no_token_configured_allows_all() {
        assert!(authorized(None, &HeaderMap::new()));
    }

    #[test]
    fn bearer_token_must_match() {
        let mut h = HeaderMap::new();
        assert!(!authorized(Some("s3cret"), &h));
        h.insert(AUTHORIZATION, HeaderValue::from_static("Bearer wrong"));
        assert!(!authorized(Some("s3cret"), &h));
        h.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert!(authorized(Some("s3cret"), &h));
    }
}
