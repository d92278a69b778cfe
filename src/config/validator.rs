use std::collections::HashSet;

use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use super::parser::{Config, WebhooksConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.bot_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "discord.bot_token cannot be empty".to_string(),
            ));
        }

        if self.discord.guild_id().is_none() {
            return Err(ConfigError::InvalidConfig(format!(
                "discord.guild_id must be a discord snowflake, got '{}'",
                self.discord.guild_id
            )));
        }

        if self.database.connection_string().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "database connection string cannot be empty".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "server.port must be between 1 and 65535".to_string(),
            ));
        }

        if self.rate_limit.window_secs == 0 || self.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidConfig(
                "rate_limit.window_secs and rate_limit.max_requests must be positive".to_string(),
            ));
        }

        if self.appeals.min_text_length > self.appeals.max_text_length {
            return Err(ConfigError::InvalidConfig(
                "appeals.min_text_length cannot exceed appeals.max_text_length".to_string(),
            ));
        }

        validate_webhooks(&self.webhooks)?;
        self.validate_roles()
    }

    fn validate_roles(&self) -> Result<(), ConfigError> {
        let pathways = &self.roles.pathways;
        let mut seen = HashSet::new();
        let role_ids = self
            .roles
            .tiers
            .iter()
            .map(|tier| tier.role_id)
            .chain(
                [
                    pathways.gaming,
                    pathways.lorebound,
                    pathways.productive,
                    pathways.news,
                ]
                .into_iter()
                .flatten(),
            );

        for role_id in role_ids {
            if role_id == 0 {
                return Err(ConfigError::InvalidConfig(
                    "role ids must be non-zero".to_string(),
                ));
            }
            if !seen.insert(role_id) {
                return Err(ConfigError::InvalidConfig(format!(
                    "role id {} is bound to more than one tier or pathway",
                    role_id
                )));
            }
        }

        let mut tier_slugs = HashSet::new();
        for tier in &self.roles.tiers {
            if crate::community::roles::tier_by_slug(&tier.slug).is_none() {
                return Err(ConfigError::InvalidConfig(format!(
                    "unknown tier '{}' in roles.tiers",
                    tier.slug
                )));
            }
            if !tier_slugs.insert(tier.slug.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "tier '{}' is listed twice in roles.tiers",
                    tier.slug
                )));
            }
        }

        Ok(())
    }
}

fn validate_webhooks(webhooks: &WebhooksConfig) -> Result<(), ConfigError> {
    let configured = [
        ("webhooks.appeals", &webhooks.appeals),
        ("webhooks.complaints", &webhooks.complaints),
        ("webhooks.mod_log", &webhooks.mod_log),
    ];

    for (name, value) in configured {
        let Some(raw) = value else {
            continue;
        };
        let parsed = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidConfig(format!("{name} is not a valid url: {e}")))?;
        if parsed.scheme() != "https" {
            return Err(ConfigError::InvalidConfig(format!(
                "{name} must use https"
            )));
        }
    }

    Ok(())
}
