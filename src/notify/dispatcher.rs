// src/notify/dispatcher.rs
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::sync::Arc;

use super::{Broadcaster, ChannelId};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("dispatch_messages_total", "Chat messages delivered.");
        describe_counter!(
            "dispatch_failures_total",
            "Destinations that failed during a dispatch."
        );
    });
}

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<ChannelId>,
    pub failed: Vec<(ChannelId, String)>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delivers rendered blocks, isolating failures per destination.
#[derive(Clone)]
pub struct Dispatcher {
    broadcaster: Arc<dyn Broadcaster>,
}

impl Dispatcher {
    pub fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self { broadcaster }
    }

    pub fn broadcaster(&self) -> &Arc<dyn Broadcaster> {
        &self.broadcaster
    }

    /// Send `blocks` in order to one channel. Stops at the first failed block
    /// for that channel; the error is logged and returned in the report.
    pub async fn send_to(&self, channel: &ChannelId, blocks: &[String]) -> DispatchReport {
        ensure_metrics_described();
        let mut report = DispatchReport::default();
        match self.deliver(channel, blocks).await {
            Ok(()) => report.delivered.push(channel.clone()),
            Err(e) => {
                counter!("dispatch_failures_total").increment(1);
                tracing::warn!(channel = %channel, error = %format!("{e:#}"), "dispatch failed");
                report.failed.push((channel.clone(), format!("{e:#}")));
            }
        }
        report
    }

    /// Send `blocks` to every channel the broadcaster lists.
    /// If listing itself fails the report is empty and the error is logged.
    pub async fn send_to_all(&self, blocks: &[String]) -> DispatchReport {
        let channels = match self.broadcaster.list_channels().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "listing destinations failed");
                return DispatchReport::default();
            }
        };
        tracing::info!(destinations = channels.len(), blocks = blocks.len(), "broadcasting");

        let mut report = DispatchReport::default();
        for ch in &channels {
            let one = self.send_to(ch, blocks).await;
            report.delivered.extend(one.delivered);
            report.failed.extend(one.failed);
        }
        report
    }

    async fn deliver(&self, channel: &ChannelId, blocks: &[String]) -> anyhow::Result<()> {
        for block in blocks {
            self.broadcaster.send(channel, block).await?;
            counter!("dispatch_messages_total").increment(1);
        }
        Ok(())
    }
}
