// src/notify/mod.rs
pub mod discord;
pub mod dispatcher;

use anyhow::Result;

pub use dispatcher::{DispatchReport, Dispatcher};

/// Opaque chat-channel identifier (a Discord snowflake in production).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat-platform capability injected into the dispatcher.
#[async_trait::async_trait]
pub trait Broadcaster: Send + Sync {
    /// Every channel the bot may post to right now (permission-filtered).
    async fn list_channels(&self) -> Result<Vec<ChannelId>>;

    /// Post one message to `channel`.
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<()>;
}
