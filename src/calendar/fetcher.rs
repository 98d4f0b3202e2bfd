// src/calendar/fetcher.rs
use anyhow::Context;
use chrono::Utc;
use metrics::{counter, gauge};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;

use super::cache::FeedCacheStore;
use super::types::FeedSnapshot;
use super::{ensure_metrics_described, project_values};

pub const DEFAULT_FEED_URL: &str = "https://nfs.faireconomy.media/ff_calendar_thisweek.json";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("feed rate limited (HTTP 429)")]
    RateLimited,
    #[error("feed returned HTTP {0}")]
    BadStatus(u16),
    #[error("feed transport error: {0}")]
    Transport(String),
    #[error("feed body is not a JSON event array: {0}")]
    Decode(String),
    #[error("could not persist snapshot: {0}")]
    Cache(String),
}

impl FetchError {
    fn outcome(&self) -> &'static str {
        match self {
            FetchError::RateLimited => "rate_limited",
            FetchError::BadStatus(_) => "bad_status",
            FetchError::Transport(_) => "transport",
            FetchError::Decode(_) => "decode",
            FetchError::Cache(_) => "cache_write",
        }
    }
}

/// Serves the cached snapshot, or pulls the remote feed once and caches it.
pub struct EventFetcher {
    url: String,
    client: Client,
    store: FeedCacheStore,
    // single-flight: overlapping triggers wait for the fetch in progress
    inflight: Mutex<()>,
}

impl EventFetcher {
    pub fn new(url: impl Into<String>, store: FeedCacheStore, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self::with_client(url, store, client))
    }

    pub fn with_client(url: impl Into<String>, store: FeedCacheStore, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
            store,
            inflight: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &FeedCacheStore {
        &self.store
    }

    pub async fn fetch(&self) -> Result<FeedSnapshot, FetchError> {
        ensure_metrics_described();
        let _guard = self.inflight.lock().await;

        if let Some(snapshot) = self.store.load().await {
            counter!("calendar_fetch_total", "outcome" => "cache").increment(1);
            tracing::debug!(events = snapshot.len(), "serving cached snapshot");
            return Ok(snapshot);
        }

        match self.fetch_remote().await {
            Ok(snapshot) => {
                counter!("calendar_fetch_total", "outcome" => "remote").increment(1);
                gauge!("calendar_snapshot_events").set(snapshot.len() as f64);
                Ok(snapshot)
            }
            Err(e) => {
                counter!("calendar_fetch_total", "outcome" => e.outcome()).increment(1);
                tracing::warn!(url = %self.url, error = %e, "feed fetch failed");
                Err(e)
            }
        }
    }

    async fn fetch_remote(&self) -> Result<FeedSnapshot, FetchError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if status != StatusCode::OK {
            return Err(FetchError::BadStatus(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        // only a non-array body fails the fetch; bad records are dropped one by one
        let raw: Vec<serde_json::Value> =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        let (events, dropped) = project_values(raw);
        if dropped > 0 {
            counter!("calendar_records_dropped_total").increment(dropped as u64);
            tracing::debug!(dropped, "dropped malformed feed records");
        }

        let snapshot = FeedSnapshot::new(events, Utc::now());
        self.store
            .save(&snapshot)
            .await
            .map_err(|e| FetchError::Cache(format!("{e:#}")))?;

        tracing::info!(events = snapshot.len(), "fetched and cached feed");
        Ok(snapshot)
    }
}
