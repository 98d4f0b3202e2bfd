//! Economic-calendar bot — Binary Entrypoint
//! Boots the liveness/command HTTP surface and the daily broadcast task.

use std::sync::Arc;

use econ_calendar_bot::{
    build_engine, build_router,
    config,
    metrics::Metrics,
    notify::discord::DiscordBroadcaster,
    scheduler::{spawn_daily_broadcast, DailySchedule},
};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("econ_calendar_bot=info,warn"));

    // Shuttle may already have installed a subscriber; keep theirs if so.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default().map_err(shuttle_runtime::Error::Custom)?;
    let token = cfg.bot_token.clone().ok_or_else(|| {
        shuttle_runtime::Error::Custom(anyhow::anyhow!("BOT_TOKEN (or DISCORD_BOT_TOKEN) missing"))
    })?;
    let tz = cfg.tz().map_err(shuttle_runtime::Error::Custom)?;

    let metrics = Metrics::init(cfg.cache_max_age_secs).map_err(shuttle_runtime::Error::Custom)?;

    let discord = DiscordBroadcaster::new(token)
        .with_api_base(cfg.discord_api_base.clone())
        .with_timeout(cfg.http_timeout_secs);
    let engine = build_engine(&cfg, Arc::new(discord)).map_err(shuttle_runtime::Error::Custom)?;

    let schedule = DailySchedule {
        tz,
        hour: cfg.schedule_hour,
        minute: cfg.schedule_minute,
    };
    spawn_daily_broadcast(engine.clone(), schedule);
    tracing::info!(
        feed = %cfg.feed_url,
        at = %format!("{:02}:{:02} {}", cfg.schedule_hour, cfg.schedule_minute, cfg.timezone),
        "calendar bot started"
    );

    let router = build_router(&cfg, engine).merge(metrics.router());
    Ok(router.into())
}
