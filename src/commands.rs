// src/commands.rs
use serde::Deserialize;

use crate::calendar::filter::Window;
use crate::engine::ReportEngine;
use crate::notify::{ChannelId, DispatchReport};

pub const DAILY_COMMAND: &str = "!dailyevents";
pub const WEEKLY_COMMAND: &str = "!weeklyevents";

/// Inbound chat message as forwarded by a gateway adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub channel_id: String,
    pub content: String,
    #[serde(default)]
    pub author_is_bot: bool,
}

/// Exact-match command lookup; anything else is not for us.
pub fn parse_command(content: &str) -> Option<Window> {
    match content {
        DAILY_COMMAND => Some(Window::Today),
        WEEKLY_COMMAND => Some(Window::CurrentWeek),
        _ => None,
    }
}

#[derive(Clone)]
pub struct CommandRouter {
    engine: ReportEngine,
}

impl CommandRouter {
    pub fn new(engine: ReportEngine) -> Self {
        Self { engine }
    }

    /// Window a message would trigger, or `None` when it is ignored.
    pub fn recognize(msg: &InboundMessage) -> Option<Window> {
        if msg.author_is_bot {
            return None;
        }
        parse_command(&msg.content)
    }

    /// Run the report for the invoking channel only.
    pub async fn handle(&self, msg: &InboundMessage) -> Option<DispatchReport> {
        let window = Self::recognize(msg)?;
        let channel = ChannelId::new(msg.channel_id.clone());
        tracing::info!(channel = %channel, ?window, "command received");
        Some(self.engine.report_to(&channel, window).await)
    }
}
