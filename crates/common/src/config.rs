//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Moderation configuration.
    #[serde(default)]
    pub moderation: ModerationConfig,
    /// Email configuration (absent = outbound email disabled).
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Site name used in notification subjects.
    pub site_name: String,
    /// Public URL of this site, used to build deep links.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Moderation thresholds and windows.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationConfig {
    /// Vote sum at or below which a post is flagged.
    #[serde(default = "default_flag_threshold")]
    pub flag_threshold: i64,
    /// Vote sum at or above which a post is highlighted.
    #[serde(default = "default_highlight_threshold")]
    pub highlight_threshold: i64,
    /// Hours a recently-modified post stays visible to moderators in
    /// thread listings even while unapproved.
    #[serde(default = "default_staff_preview_hours")]
    pub staff_preview_hours: i64,
    /// Hours after creation during which a post remains editable.
    #[serde(default = "default_edit_window_hours")]
    pub edit_window_hours: i64,
    /// Hours a soft-deleted post or empty thread survives before the
    /// purge job hard-deletes it.
    #[serde(default = "default_purge_age_hours")]
    pub purge_age_hours: i64,
    /// Seconds between purge runs.
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
    /// Maximum images per post.
    #[serde(default = "default_max_media_per_post")]
    pub max_media_per_post: usize,
    /// Maximum file attachments per post.
    #[serde(default = "default_max_media_per_post")]
    pub max_attachments_per_post: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            flag_threshold: default_flag_threshold(),
            highlight_threshold: default_highlight_threshold(),
            staff_preview_hours: default_staff_preview_hours(),
            edit_window_hours: default_edit_window_hours(),
            purge_age_hours: default_purge_age_hours(),
            purge_interval_secs: default_purge_interval_secs(),
            max_media_per_post: default_max_media_per_post(),
            max_attachments_per_post: default_max_media_per_post(),
        }
    }
}

/// Outbound email configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Provider name: `smtp` or `mailgun`.
    #[serde(default = "default_email_provider")]
    pub provider: String,
    /// From address.
    pub from_address: String,
    /// From display name.
    pub from_name: String,
    /// SMTP host (smtp provider).
    #[serde(default)]
    pub smtp_host: Option<String>,
    /// SMTP port (smtp provider).
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username (smtp provider).
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// SMTP password (smtp provider).
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// Mailgun API key (mailgun provider).
    #[serde(default)]
    pub mailgun_api_key: Option<String>,
    /// Mailgun domain (mailgun provider).
    #[serde(default)]
    pub mailgun_domain: Option<String>,
    /// Use the Mailgun EU region.
    #[serde(default)]
    pub mailgun_eu_region: bool,
}

fn default_redis_prefix() -> String {
    "agora".to_string()
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_flag_threshold() -> i64 {
    -3
}

const fn default_highlight_threshold() -> i64 {
    3
}

const fn default_staff_preview_hours() -> i64 {
    24
}

const fn default_edit_window_hours() -> i64 {
    24
}

const fn default_purge_age_hours() -> i64 {
    24
}

const fn default_purge_interval_secs() -> u64 {
    3600
}

const fn default_max_media_per_post() -> usize {
    3
}

fn default_email_provider() -> String {
    "smtp".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `AGORA_ENV`)
    /// 3. Environment variables with `AGORA_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("AGORA_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AGORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("AGORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_defaults() {
        let config = ModerationConfig::default();
        assert_eq!(config.flag_threshold, -3);
        assert_eq!(config.highlight_threshold, 3);
        assert_eq!(config.staff_preview_hours, 24);
        assert_eq!(config.edit_window_hours, 24);
        assert_eq!(config.purge_age_hours, 24);
        assert_eq!(config.max_media_per_post, 3);
    }
}
