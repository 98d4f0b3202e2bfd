// src/config/bot.rs
use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

use crate::calendar::fetcher::DEFAULT_FEED_URL;
use crate::notify::discord::DEFAULT_API_BASE;
use crate::render::{DEFAULT_DISPLAY_OFFSET_HOURS, MAX_BLOCK_LEN};

pub const ENV_CONFIG_PATH: &str = "BOT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/bot.toml";

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}
fn default_cache_path() -> PathBuf {
    PathBuf::from("cached_events.json")
}
fn default_cache_max_age_secs() -> u64 {
    7 * 24 * 3600
}
fn default_http_timeout_secs() -> u64 {
    10
}
fn default_schedule_hour() -> u32 {
    6
}
fn default_schedule_minute() -> u32 {
    10
}
fn default_timezone() -> String {
    "America/New_York".to_string()
}
fn default_display_offset_hours() -> i32 {
    DEFAULT_DISPLAY_OFFSET_HOURS
}
fn default_max_block_len() -> usize {
    MAX_BLOCK_LEN
}
fn default_discord_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// 0 keeps a cache file forever.
    #[serde(default = "default_cache_max_age_secs")]
    pub cache_max_age_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_schedule_hour")]
    pub schedule_hour: u32,
    #[serde(default = "default_schedule_minute")]
    pub schedule_minute: u32,
    /// IANA name, e.g. "America/New_York".
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_display_offset_hours")]
    pub display_offset_hours: i32,
    #[serde(default = "default_max_block_len")]
    pub max_block_len: usize,
    #[serde(default = "default_discord_api_base")]
    pub discord_api_base: String,
    /// Never read from the file; only from BOT_TOKEN / DISCORD_BOT_TOKEN.
    #[serde(skip)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub command_relay_token: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            cache_path: default_cache_path(),
            cache_max_age_secs: default_cache_max_age_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            schedule_hour: default_schedule_hour(),
            schedule_minute: default_schedule_minute(),
            timezone: default_timezone(),
            display_offset_hours: default_display_offset_hours(),
            max_block_len: default_max_block_len(),
            discord_api_base: default_discord_api_base(),
            bot_token: None,
            command_relay_token: None,
        }
    }
}

impl BotConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: BotConfig = toml::from_str(s).context("parsing bot config toml")?;
        cfg.sanitized()
    }

    /// Parsed schedule timezone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("unknown timezone '{}': {e}", self.timezone))
    }

    fn sanitized(mut self) -> Result<Self> {
        if self.max_block_len == 0 {
            self.max_block_len = default_max_block_len();
        }
        self.schedule_hour = self.schedule_hour.min(23);
        self.schedule_minute = self.schedule_minute.min(59);
        if !(-12..=14).contains(&self.display_offset_hours) {
            self.display_offset_hours = default_display_offset_hours();
        }
        self.tz()?;
        Ok(self)
    }

    /// Environment wins over the file for secrets and deploy-specific paths.
    pub fn apply_env(mut self) -> Self {
        if let Some(t) = env::var("BOT_TOKEN")
            .ok()
            .or_else(|| env::var("DISCORD_BOT_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
        {
            self.bot_token = Some(t.trim().to_string());
        }
        if let Ok(u) = env::var("FEED_URL") {
            if !u.trim().is_empty() {
                self.feed_url = u.trim().to_string();
            }
        }
        if let Ok(p) = env::var("CACHE_FILE") {
            if !p.trim().is_empty() {
                self.cache_path = PathBuf::from(p.trim());
            }
        }
        self
    }
}

pub fn load_from(path: &Path) -> Result<BotConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading bot config from {}", path.display()))?;
    BotConfig::from_toml_str(&content)
}

/// Load config using env var + fallbacks:
/// 1) $BOT_CONFIG_PATH
/// 2) config/bot.toml
/// 3) built-in defaults
///
/// Environment overrides are applied last.
pub fn load_default() -> Result<BotConfig> {
    let cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        load_from(&pb)?
    } else {
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            load_from(&default_p)?
        } else {
            BotConfig::default()
        }
    };
    Ok(cfg.apply_env())
}
