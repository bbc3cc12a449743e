use chanrelay_types::{ChannelType, RelayInfo};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_true() -> bool {
    true
}

/// Configuration for a single upstream channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Human-readable channel name, unique within the file.
    pub name: String,
    /// Provider class; accepts a name (`azure`) or a numeric code (`3`).
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    /// Upstream base URL; falls back to the channel type's default.
    #[serde(default)]
    pub base_url: Option<String>,
    /// API key, or `<project>|<service-account-json>` for Vertex channels.
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_version: Option<String>,
    /// Sent as `OpenAI-Organization` on OpenAI channels.
    #[serde(default)]
    pub organization: Option<String>,
    /// Whether this channel is enabled (defaults to `true`).
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ChannelConfig {
    /// Effective base URL, with trailing slashes removed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.channel_type.default_base_url())
            .trim_end_matches('/')
    }

    /// Builds the per-request context for relaying `model` on this channel.
    #[must_use]
    pub fn relay_info(
        &self,
        request_path: &str,
        model: &str,
        stream: bool,
        prompt_tokens: u64,
    ) -> RelayInfo {
        RelayInfo::builder()
            .channel_type(self.channel_type)
            .api_key(self.api_key.clone())
            .base_url(self.base_url())
            .request_url_path(request_path)
            .api_version(self.api_version.clone().unwrap_or_default())
            .upstream_model_name(model)
            .is_stream(stream)
            .prompt_tokens(prompt_tokens)
            .maybe_organization(self.organization.clone())
            .build()
    }
}

fn default_refresh_margin() -> u64 {
    600
}

/// Access-token cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCacheConfig {
    /// Tokens expiring within this many seconds are refreshed (defaults to 600).
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: u64,
}

impl Default for TokenCacheConfig {
    fn default() -> Self {
        Self {
            refresh_margin_secs: default_refresh_margin(),
        }
    }
}

impl TokenCacheConfig {
    #[must_use]
    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset (defaults to `info`).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub token_cache: TokenCacheConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Parses configuration from a YAML string, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        use figment::{
            Figment,
            providers::{Format as _, Serialized, Yaml},
        };
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .extract()
    }

    /// Loads configuration from a file path, merged with defaults and then
    /// with `CHANRELAY_*` environment variables (`__` separates nesting).
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn from_file(path: &std::path::Path) -> Result<Self, figment::Error> {
        use figment::{
            Figment,
            providers::{Env, Format as _, Serialized, Yaml},
        };
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("CHANRELAY_").split("__"))
            .extract()
    }

    /// Finds an enabled channel by name.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.channels
            .iter()
            .find(|c| c.enabled && c.name == name)
    }
}
