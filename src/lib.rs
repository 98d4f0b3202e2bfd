// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod calendar;
pub mod commands;
pub mod config;
pub mod engine;
pub mod metrics;
pub mod notify;
pub mod render;
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::calendar::fetcher::{EventFetcher, FetchError};
pub use crate::calendar::filter::Window;
pub use crate::calendar::types::{EconomicEvent, FeedSnapshot, Impact};
pub use crate::engine::ReportEngine;
pub use crate::notify::{Broadcaster, ChannelId, DispatchReport, Dispatcher};

use std::sync::Arc;
use std::time::Duration;

use crate::calendar::cache::FeedCacheStore;
use crate::commands::CommandRouter;
use crate::config::BotConfig;
use crate::render::Renderer;

/// Wire fetcher, renderer and dispatcher from `cfg` around `broadcaster`.
pub fn build_engine(cfg: &BotConfig, broadcaster: Arc<dyn Broadcaster>) -> anyhow::Result<ReportEngine> {
    let store = FeedCacheStore::new(cfg.cache_path.clone())
        .with_max_age_secs(cfg.cache_max_age_secs)
        .with_week_tz(cfg.tz()?);
    let fetcher = EventFetcher::new(
        cfg.feed_url.clone(),
        store,
        Duration::from_secs(cfg.http_timeout_secs),
    )?;
    let renderer = Renderer::new(cfg.display_offset_hours, cfg.max_block_len);
    Ok(ReportEngine::new(
        Arc::new(fetcher),
        Dispatcher::new(broadcaster),
        renderer,
    ))
}

/// HTTP surface (liveness + command relay) for an already built engine.
pub fn build_router(cfg: &BotConfig, engine: ReportEngine) -> axum::Router {
    api::create_router(api::AppState {
        commands: CommandRouter::new(engine),
        relay_token: cfg.command_relay_token.clone(),
    })
}
