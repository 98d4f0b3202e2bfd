use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use super::{Broadcaster, ChannelId};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const ADMINISTRATOR: u64 = 1 << 3;
const VIEW_CHANNEL: u64 = 1 << 10;
const SEND_MESSAGES: u64 = 1 << 11;

const MAX_RETRIES: u8 = 10;
const BACKOFF_BASE_MS: u64 = 500;

const GUILD_TEXT: u8 = 0;
const OVERWRITE_ROLE: u8 = 0;
const OVERWRITE_MEMBER: u8 = 1;

/// Discord REST client acting as the bot user.
#[derive(Clone)]
pub struct DiscordBroadcaster {
    api_base: String,
    token: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordBroadcaster {
    pub fn new(token: String) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.clamp(1, MAX_RETRIES);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let rsp = self
            .client
            .get(self.url(path))
            .header("Authorization", self.auth())
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {path}"))?
            .error_for_status()
            .with_context(|| format!("GET {path} non-2xx"))?;
        rsp.json::<T>()
            .await
            .with_context(|| format!("decode {path}"))
    }

    async fn sendable_in_guild(&self, guild: &Guild, bot_id: &str) -> Result<Vec<ChannelId>> {
        let roles: Vec<Role> = self.get_json(&format!("/guilds/{}/roles", guild.id)).await?;
        let member: Member = self
            .get_json(&format!("/guilds/{}/members/{}", guild.id, bot_id))
            .await?;
        let channels: Vec<Channel> = self
            .get_json(&format!("/guilds/{}/channels", guild.id))
            .await?;

        let base = base_permissions(&guild.id, &roles, &member.roles);
        Ok(channels
            .iter()
            .filter(|c| c.kind == GUILD_TEXT)
            .filter(|c| {
                let p = channel_permissions(base, &guild.id, bot_id, &member.roles, c);
                p & (VIEW_CHANNEL | SEND_MESSAGES) == (VIEW_CHANNEL | SEND_MESSAGES)
            })
            .map(|c| ChannelId::new(c.id.clone()))
            .collect())
    }
}

#[async_trait::async_trait]
impl Broadcaster for DiscordBroadcaster {
    async fn list_channels(&self) -> Result<Vec<ChannelId>> {
        let me: User = self.get_json("/users/@me").await?;
        let guilds: Vec<Guild> = self.get_json("/users/@me/guilds").await?;

        let mut out = Vec::new();
        for g in &guilds {
            match self.sendable_in_guild(g, &me.id).await {
                Ok(mut v) => out.append(&mut v),
                Err(e) => {
                    tracing::warn!(guild = %g.id, error = %format!("{e:#}"), "skipping guild");
                }
            }
        }
        Ok(out)
    }

    async fn send(&self, channel: &ChannelId, text: &str) -> Result<()> {
        let path = format!("/channels/{}/messages", channel);
        let payload = CreateMessage { content: text };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(self.url(&path))
                .header("Authorization", self.auth())
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let retryable = match res {
                Ok(rsp) => {
                    let status = rsp.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    if !(status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()) {
                        return Err(anyhow!("Discord API HTTP {status} for channel {channel}"));
                    }
                    anyhow!("Discord API HTTP {status} for channel {channel}")
                }
                Err(e) => anyhow!("Discord request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(retryable);
            }
            tokio::time::sleep(backoff(attempt)).await;
        }
    }
}

/// Exponential backoff after the `attempt`-th failure: 500ms, 1s, 2s, ...
fn backoff(attempt: u8) -> Duration {
    let shift = u32::from(attempt.saturating_sub(1));
    Duration::from_millis(
        BACKOFF_BASE_MS.saturating_mul(1u64.checked_shl(shift).unwrap_or(u64::MAX)),
    )
}

/// Guild-level permissions of a member: @everyone plus every held role.
pub fn base_permissions(guild_id: &str, roles: &[Role], member_roles: &[String]) -> u64 {
    let mut perms = 0u64;
    for r in roles {
        if r.id == guild_id || member_roles.contains(&r.id) {
            perms |= parse_bits(&r.permissions);
        }
    }
    if perms & ADMINISTRATOR != 0 {
        return u64::MAX;
    }
    perms
}

/// Apply channel overwrites in Discord's order: @everyone, roles, member.
pub fn channel_permissions(
    base: u64,
    guild_id: &str,
    member_id: &str,
    member_roles: &[String],
    channel: &Channel,
) -> u64 {
    if base & ADMINISTRATOR != 0 {
        return u64::MAX;
    }
    let mut perms = base;
    let ows = &channel.permission_overwrites;

    if let Some(ow) = ows.iter().find(|o| o.id == guild_id) {
        perms &= !parse_bits(&ow.deny);
        perms |= parse_bits(&ow.allow);
    }

    let (mut allow, mut deny) = (0u64, 0u64);
    for ow in ows
        .iter()
        .filter(|o| o.kind == OVERWRITE_ROLE && member_roles.contains(&o.id))
    {
        allow |= parse_bits(&ow.allow);
        deny |= parse_bits(&ow.deny);
    }
    perms &= !deny;
    perms |= allow;

    if let Some(ow) = ows
        .iter()
        .find(|o| o.kind == OVERWRITE_MEMBER && o.id == member_id)
    {
        perms &= !parse_bits(&ow.deny);
        perms |= parse_bits(&ow.allow);
    }
    perms
}

fn parse_bits(s: &str) -> u64 {
    s.parse().unwrap_or(0)
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct Guild {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Role {
    pub id: String,
    #[serde(default)]
    pub permissions: String,
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub permission_overwrites: Vec<Overwrite>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Overwrite {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub allow: String,
    #[serde(default)]
    pub deny: String,
}
