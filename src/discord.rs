use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Serialize, Serializer};
use serenity::all::{
    EditMember, GuildId, Http, HttpError, Member, Permissions, RoleId, Timestamp, UserId,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DiscordConfig;

pub mod permissions;

pub use self::permissions::{has_permission, permission_names};

/// Discord caps communication timeouts at 28 days.
pub const MAX_TIMEOUT_MINUTES: u32 = 28 * 24 * 60;

const MAX_DELETE_MESSAGE_DAYS: u8 = 7;

#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("discord integration is not configured")]
    NotConfigured,
    #[error("invalid discord id: {0}")]
    InvalidId(String),
    #[error("discord resource not found")]
    NotFound,
    #[error("discord refused the request: {0}")]
    Forbidden(String),
    #[error("discord api error: {0}")]
    Api(String),
}

impl From<serenity::Error> for DiscordError {
    fn from(err: serenity::Error) -> Self {
        if let serenity::Error::Http(HttpError::UnsuccessfulRequest(ref response)) = err {
            match response.status_code.as_u16() {
                404 => return DiscordError::NotFound,
                401 | 403 => return DiscordError::Forbidden(response.error.message.clone()),
                _ => {}
            }
        }
        DiscordError::Api(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildMember {
    pub user_id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub nick: Option<String>,
    pub avatar_url: Option<String>,
    /// Role ids exceed what a JSON number can hold exactly, so they go out
    /// as strings.
    #[serde(serialize_with = "ids_as_strings")]
    pub roles: Vec<u64>,
    pub joined_at: Option<String>,
    pub timed_out_until: Option<String>,
}

fn ids_as_strings<S: Serializer>(ids: &[u64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(ids.iter().map(|id| id.to_string()))
}

impl GuildMember {
    pub fn display_name(&self) -> &str {
        self.nick
            .as_deref()
            .or(self.global_name.as_deref())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildSummary {
    pub id: String,
    pub name: String,
    pub icon_url: Option<String>,
    pub member_count: Option<u64>,
    pub online_count: Option<u64>,
}

/// Read and moderation access to the community guild.
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    fn is_configured(&self) -> bool;

    /// A single member lookup; Discord's 404 is reported as `false`.
    async fn check_guild_membership(&self, user_id: &str) -> Result<bool, DiscordError>;

    async fn get_member(&self, user_id: &str) -> Result<Option<GuildMember>, DiscordError>;

    /// Guild-level permissions granted by the member's roles and @everyone.
    /// Costs a role listing, so callers ask only when they need it.
    async fn member_permissions(&self, member: &GuildMember) -> Result<Permissions, DiscordError>;

    async fn guild_summary(&self) -> Result<GuildSummary, DiscordError>;

    async fn add_role(&self, user_id: &str, role_id: u64, reason: &str)
    -> Result<(), DiscordError>;

    async fn remove_role(
        &self,
        user_id: &str,
        role_id: u64,
        reason: &str,
    ) -> Result<(), DiscordError>;

    async fn ban(
        &self,
        user_id: &str,
        delete_message_days: u8,
        reason: &str,
    ) -> Result<(), DiscordError>;

    async fn unban(&self, user_id: &str) -> Result<(), DiscordError>;

    async fn timeout(&self, user_id: &str, minutes: u32, reason: &str)
    -> Result<(), DiscordError>;

    async fn remove_timeout(&self, user_id: &str) -> Result<(), DiscordError>;

    async fn kick(&self, user_id: &str, reason: &str) -> Result<(), DiscordError>;
}

/// Discord ids are positive 64-bit decimals of 17 to 20 digits.
pub fn parse_snowflake(raw: &str) -> Result<u64, DiscordError> {
    let trimmed = raw.trim();
    if !(17..=20).contains(&trimmed.len()) || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DiscordError::InvalidId(raw.to_string()));
    }
    trimmed
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| DiscordError::InvalidId(raw.to_string()))
}

#[derive(Clone)]
pub struct DiscordClient {
    http: Option<Arc<Http>>,
    guild_id: Option<GuildId>,
    request_timeout: Duration,
}

impl DiscordClient {
    pub fn new(config: &DiscordConfig) -> Self {
        let token = config.bot_token.expose_secret().trim();
        let http = (!token.is_empty()).then(|| Arc::new(Http::new(token)));
        let guild_id = config.guild_id().map(GuildId::new);

        if http.is_none() || guild_id.is_none() {
            warn!("discord bot token or guild id missing; guild lookups are disabled");
        } else {
            info!("discord REST client ready for guild {}", config.guild_id);
        }

        Self {
            http,
            guild_id,
            request_timeout: Duration::from_secs(config.api_timeout_secs.max(1)),
        }
    }

    fn target(&self) -> Result<(&Http, GuildId), DiscordError> {
        match (self.http.as_deref(), self.guild_id) {
            (Some(http), Some(guild_id)) => Ok((http, guild_id)),
            _ => Err(DiscordError::NotConfigured),
        }
    }

    async fn call<T, F>(&self, what: &str, fut: F) -> Result<T, DiscordError>
    where
        F: Future<Output = Result<T, serenity::Error>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result.map_err(DiscordError::from),
            Err(_) => Err(DiscordError::Api(format!("{what} timed out"))),
        }
    }

    async fn fetch_member(&self, user_id: &str) -> Result<Option<Member>, DiscordError> {
        let user_id = UserId::new(parse_snowflake(user_id)?);
        let (http, guild_id) = self.target()?;

        match self
            .call("member lookup", http.get_member(guild_id, user_id))
            .await
        {
            Ok(member) => Ok(Some(member)),
            Err(DiscordError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

}

#[async_trait]
impl GuildDirectory for DiscordClient {
    fn is_configured(&self) -> bool {
        self.target().is_ok()
    }

    async fn check_guild_membership(&self, user_id: &str) -> Result<bool, DiscordError> {
        let is_member = self.fetch_member(user_id).await?.is_some();
        debug!(user_id, is_member, "checked guild membership");
        Ok(is_member)
    }

    async fn get_member(&self, user_id: &str) -> Result<Option<GuildMember>, DiscordError> {
        let Some(member) = self.fetch_member(user_id).await? else {
            return Ok(None);
        };
        Ok(Some(GuildMember {
            user_id: member.user.id.to_string(),
            username: member.user.name.clone(),
            global_name: member.user.global_name.clone(),
            nick: member.nick.clone(),
            avatar_url: member.user.avatar_url(),
            roles: member.roles.iter().map(|role| role.get()).collect(),
            joined_at: member.joined_at.map(|ts| ts.to_string()),
            timed_out_until: member.communication_disabled_until.map(|ts| ts.to_string()),
        }))
    }

    async fn member_permissions(&self, member: &GuildMember) -> Result<Permissions, DiscordError> {
        let (http, guild_id) = self.target()?;
        let roles = self
            .call("role listing", http.get_guild_roles(guild_id))
            .await?;

        // The @everyone role shares the guild's id.
        let everyone = RoleId::new(guild_id.get());
        Ok(roles
            .iter()
            .filter(|role| role.id == everyone || member.roles.contains(&role.id.get()))
            .fold(Permissions::empty(), |acc, role| acc | role.permissions))
    }

    async fn guild_summary(&self) -> Result<GuildSummary, DiscordError> {
        let (http, guild_id) = self.target()?;
        let guild = self
            .call("guild lookup", http.get_guild_with_counts(guild_id))
            .await?;

        Ok(GuildSummary {
            id: guild.id.to_string(),
            icon_url: guild.icon_url(),
            name: guild.name,
            member_count: guild.approximate_member_count,
            online_count: guild.approximate_presence_count,
        })
    }

    async fn add_role(
        &self,
        user_id: &str,
        role_id: u64,
        reason: &str,
    ) -> Result<(), DiscordError> {
        let user_id = UserId::new(parse_snowflake(user_id)?);
        let (http, guild_id) = self.target()?;
        self.call(
            "role add",
            http.add_member_role(guild_id, user_id, RoleId::new(role_id), Some(reason)),
        )
        .await
    }

    async fn remove_role(
        &self,
        user_id: &str,
        role_id: u64,
        reason: &str,
    ) -> Result<(), DiscordError> {
        let user_id = UserId::new(parse_snowflake(user_id)?);
        let (http, guild_id) = self.target()?;
        self.call(
            "role removal",
            http.remove_member_role(guild_id, user_id, RoleId::new(role_id), Some(reason)),
        )
        .await
    }

    async fn ban(
        &self,
        user_id: &str,
        delete_message_days: u8,
        reason: &str,
    ) -> Result<(), DiscordError> {
        let user_id = UserId::new(parse_snowflake(user_id)?);
        let (http, guild_id) = self.target()?;
        let days = delete_message_days.min(MAX_DELETE_MESSAGE_DAYS);
        self.call(
            "ban",
            guild_id.ban_with_reason(http, user_id, days, reason),
        )
        .await
    }

    async fn unban(&self, user_id: &str) -> Result<(), DiscordError> {
        let user_id = UserId::new(parse_snowflake(user_id)?);
        let (http, guild_id) = self.target()?;
        self.call("unban", guild_id.unban(http, user_id)).await
    }

    async fn timeout(
        &self,
        user_id: &str,
        minutes: u32,
        reason: &str,
    ) -> Result<(), DiscordError> {
        let user_id = UserId::new(parse_snowflake(user_id)?);
        let (http, guild_id) = self.target()?;

        let minutes = minutes.clamp(1, MAX_TIMEOUT_MINUTES);
        let until_unix = chrono::Utc::now().timestamp() + i64::from(minutes) * 60;
        let until = Timestamp::from_unix_timestamp(until_unix)
            .map_err(|e| DiscordError::Api(format!("invalid timeout end: {e}")))?;

        let edit = EditMember::new()
            .disable_communication_until_datetime(until)
            .audit_log_reason(reason);
        self.call("timeout", guild_id.edit_member(http, user_id, edit))
            .await
            .map(|_| ())
    }

    async fn remove_timeout(&self, user_id: &str) -> Result<(), DiscordError> {
        let user_id = UserId::new(parse_snowflake(user_id)?);
        let (http, guild_id) = self.target()?;
        let edit = EditMember::new().enable_communication();
        self.call("timeout removal", guild_id.edit_member(http, user_id, edit))
            .await
            .map(|_| ())
    }

    async fn kick(&self, user_id: &str, reason: &str) -> Result<(), DiscordError> {
        let user_id = UserId::new(parse_snowflake(user_id)?);
        let (http, guild_id) = self.target()?;
        self.call("kick", guild_id.kick_with_reason(http, user_id, reason))
            .await
    }
}
