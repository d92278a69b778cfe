pub use self::parser::{
    AppealsConfig, Config, DatabaseConfig, DbType, DiscordConfig, LoggingConfig, RateLimitConfig,
    RolesConfig, WebhooksConfig,
};
#[cfg(test)]
pub use self::parser::{PathwayRoles, TierRole};
pub use self::validator::ConfigError;

mod parser;
mod validator;
