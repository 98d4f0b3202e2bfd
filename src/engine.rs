// src/engine.rs
//! Fetch → filter → render → dispatch, shared by the scheduler and chat commands.

use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;

use crate::calendar::fetcher::{EventFetcher, FetchError};
use crate::calendar::filter::{filter, Window};
use crate::calendar::types::FeedSnapshot;
use crate::notify::{ChannelId, DispatchReport, Dispatcher};
use crate::render::Renderer;

pub const FETCH_FAILED_MESSAGE: &str = "An error occurred while fetching the events.";

#[derive(Clone)]
pub struct ReportEngine {
    fetcher: Arc<EventFetcher>,
    dispatcher: Dispatcher,
    renderer: Renderer,
}

impl ReportEngine {
    pub fn new(fetcher: Arc<EventFetcher>, dispatcher: Dispatcher, renderer: Renderer) -> Self {
        Self {
            fetcher,
            dispatcher,
            renderer,
        }
    }

    pub fn fetcher(&self) -> &Arc<EventFetcher> {
        &self.fetcher
    }

    /// Blocks for `window`, relative to `now`.
    pub fn blocks_for<Tz: TimeZone>(
        &self,
        snapshot: &FeedSnapshot,
        window: Window,
        now: &DateTime<Tz>,
    ) -> Vec<String> {
        let events = filter(snapshot, window, now);
        self.renderer.render(&events, window)
    }

    /// On-demand report for one channel. A failed fetch is answered with a
    /// short error message instead of silence.
    pub async fn report_to(&self, channel: &ChannelId, window: Window) -> DispatchReport {
        self.report_to_at(channel, window, &Local::now()).await
    }

    pub async fn report_to_at<Tz: TimeZone>(
        &self,
        channel: &ChannelId,
        window: Window,
        now: &DateTime<Tz>,
    ) -> DispatchReport {
        let blocks = match self.fetcher.fetch().await {
            Ok(snapshot) => self.blocks_for(&snapshot, window, now),
            Err(e) => {
                tracing::warn!(channel = %channel, ?window, error = %e, "report aborted");
                vec![FETCH_FAILED_MESSAGE.to_string()]
            }
        };
        self.dispatcher.send_to(channel, &blocks).await
    }

    /// Scheduled run: impact-filtered snapshot to every sendable channel.
    /// An empty snapshot sends nothing.
    pub async fn broadcast_all(&self) -> Result<DispatchReport, FetchError> {
        let snapshot = self.fetcher.fetch().await?;
        if snapshot.is_empty() {
            tracing::info!("No events found.");
            return Ok(DispatchReport::default());
        }
        let blocks = self.blocks_for(&snapshot, Window::Snapshot, &Local::now());
        let report = self.dispatcher.send_to_all(&blocks).await;
        tracing::info!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "scheduled broadcast finished"
        );
        Ok(report)
    }
}
