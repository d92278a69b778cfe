use super::ConfigError;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub webhooks: WebhooksConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub appeals: AppealsConfig,
    #[serde(default)]
    pub roles: RolesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default = "empty_secret")]
    pub admin_token: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default = "empty_secret")]
    pub bot_token: SecretString,
    #[serde(default)]
    pub guild_id: String,
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

impl DiscordConfig {
    /// The guild id, when it reads as a Discord snowflake.
    pub fn guild_id(&self) -> Option<u64> {
        crate::discord::parse_snowflake(&self.guild_id).ok()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhooksConfig {
    #[serde(default)]
    pub appeals: Option<String>,
    #[serde(default)]
    pub complaints: Option<String>,
    #[serde(default)]
    pub mod_log: Option<String>,
    #[serde(default = "default_webhook_username")]
    pub username: String,
}

impl Default for WebhooksConfig {
    fn default() -> Self {
        Self {
            appeals: None,
            complaints: None,
            mod_log: None,
            username: default_webhook_username(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(alias = "console", default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub min_connections: Option<u32>,
}

impl DatabaseConfig {
    pub fn db_type(&self) -> DbType {
        let url = self.connection_string();
        if url.starts_with("sqlite://") {
            DbType::Sqlite
        } else {
            DbType::Postgres
        }
    }

    pub fn connection_string(&self) -> String {
        if let Some(ref url) = self.url {
            url.clone()
        } else if let Some(ref file) = self.filename {
            format!("sqlite://{}", file)
        } else {
            String::new()
        }
    }

    pub fn sqlite_path(&self) -> Option<String> {
        if let DbType::Sqlite = self.db_type() {
            let url = self.connection_string();
            Some(url.strip_prefix("sqlite://").unwrap_or(&url).to_string())
        } else {
            None
        }
    }

    pub fn max_connections(&self) -> Option<u32> {
        match self.db_type() {
            DbType::Postgres => self.max_connections,
            DbType::Sqlite => Some(1),
        }
    }

    pub fn min_connections(&self) -> Option<u32> {
        match self.db_type() {
            DbType::Postgres => self.min_connections,
            DbType::Sqlite => Some(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Postgres,
    Sqlite,
}

impl DbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Postgres => "postgres",
            DbType::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_rate_limit_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_rate_limit_window_secs(),
            max_requests: default_rate_limit_max_requests(),
            sweep_interval_secs: default_rate_limit_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppealsConfig {
    #[serde(default = "default_appeal_cooldown_hours")]
    pub cooldown_hours: i64,
    #[serde(default = "default_appeal_min_text_length")]
    pub min_text_length: usize,
    #[serde(default = "default_appeal_max_text_length")]
    pub max_text_length: usize,
}

impl Default for AppealsConfig {
    fn default() -> Self {
        Self {
            cooldown_hours: default_appeal_cooldown_hours(),
            min_text_length: default_appeal_min_text_length(),
            max_text_length: default_appeal_max_text_length(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RolesConfig {
    #[serde(default)]
    pub tiers: Vec<TierRole>,
    #[serde(default)]
    pub pathways: PathwayRoles,
    #[serde(default)]
    pub staff: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TierRole {
    pub slug: String,
    pub role_id: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PathwayRoles {
    #[serde(default)]
    pub gaming: Option<u64>,
    #[serde(default)]
    pub lorebound: Option<u64>,
    #[serde(default)]
    pub productive: Option<u64>,
    #[serde(default)]
    pub news: Option<u64>,
}

impl PathwayRoles {
    pub fn role_for(&self, slug: &str) -> Option<u64> {
        match slug {
            "gaming" => self.gaming,
            "lorebound" => self.lorebound,
            "productive" => self.productive,
            "news" => self.news,
            _ => None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        Self::load_from_file(&config_path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("CONCLAVE_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = SecretString::from(value);
        }
        if let Ok(value) = std::env::var("CONCLAVE_DISCORD_GUILD_ID") {
            self.discord.guild_id = value;
        }
        if let Ok(value) = std::env::var("CONCLAVE_ADMIN_TOKEN") {
            self.server.admin_token = SecretString::from(value);
        }
        if let Ok(value) = std::env::var("CONCLAVE_DATABASE_URL") {
            self.database.url = Some(value);
        }
        if let Ok(value) = std::env::var("CONCLAVE_WEBHOOK_APPEALS") {
            self.webhooks.appeals = Some(value);
        }
        if let Ok(value) = std::env::var("CONCLAVE_WEBHOOK_COMPLAINTS") {
            self.webhooks.complaints = Some(value);
        }
        if let Ok(value) = std::env::var("CONCLAVE_WEBHOOK_MOD_LOG") {
            self.webhooks.mod_log = Some(value);
        }
    }
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_timeout_secs() -> u64 {
    10
}

fn default_webhook_username() -> String {
    "The Conclave".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_rate_limit_max_requests() -> u32 {
    10
}

fn default_rate_limit_sweep_interval_secs() -> u64 {
    300
}

fn default_appeal_cooldown_hours() -> i64 {
    24
}

fn default_appeal_min_text_length() -> usize {
    20
}

fn default_appeal_max_text_length() -> usize {
    4000
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    const MINIMAL: &str = r#"
server:
  port: 9100
  admin_token: "s3cret"
discord:
  bot_token: "bot-token"
  guild_id: "123456789012345678"
database:
  filename: "/tmp/conclave.db"
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = serde_yaml::from_str(MINIMAL).expect("parse");

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.admin_token.expose_secret(), "s3cret");
        assert_eq!(config.discord.guild_id(), Some(123456789012345678));
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.appeals.cooldown_hours, 24);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.webhooks.appeals.is_none());
        assert_eq!(config.webhooks.username, "The Conclave");
        assert!(config.roles.tiers.is_empty());
    }

    #[test]
    fn database_type_follows_connection_string() {
        let config: Config = serde_yaml::from_str(MINIMAL).expect("parse");
        assert_eq!(config.database.db_type(), DbType::Sqlite);
        assert_eq!(
            config.database.sqlite_path().as_deref(),
            Some("/tmp/conclave.db")
        );
        assert_eq!(config.database.max_connections(), Some(1));

        let postgres = DatabaseConfig {
            url: Some("postgres://conclave@localhost/conclave".to_string()),
            filename: None,
            max_connections: Some(8),
            min_connections: None,
        };
        assert_eq!(postgres.db_type(), DbType::Postgres);
        assert!(postgres.sqlite_path().is_none());
        assert_eq!(postgres.max_connections(), Some(8));
    }

    #[test]
    fn pathway_roles_resolve_by_slug() {
        let roles = PathwayRoles {
            gaming: Some(1),
            lorebound: None,
            productive: Some(3),
            news: None,
        };
        assert_eq!(roles.role_for("gaming"), Some(1));
        assert_eq!(roles.role_for("lorebound"), None);
        assert_eq!(roles.role_for("productive"), Some(3));
        assert_eq!(roles.role_for("cooking"), None);
    }
}
