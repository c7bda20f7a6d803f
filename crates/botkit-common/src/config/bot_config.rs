//! Bot configuration
//!
//! Loads configuration from environment variables, falling back to defaults
//! for everything except the token.

use std::{env, fmt};

use botkit_core::Intents;
use serde::Deserialize;

/// Main bot configuration
#[derive(Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub token: String,
    /// Raw intent bits sent with Identify
    #[serde(default = "default_intents")]
    pub intents: u64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_gateway_version")]
    pub gateway_version: u8,
    /// Request the full member list for every guild on GUILD_CREATE
    #[serde(default)]
    pub memoize_guilds: bool,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
}

/// Reconnect backoff settings for dropped connections
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Presence announced in Identify
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    /// online, idle, dnd or invisible
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub activity_name: Option<String>,
    /// 0 playing, 1 streaming, 2 listening, 3 watching, 5 competing
    #[serde(default)]
    pub activity_type: u8,
    #[serde(default)]
    pub afk: bool,
    /// Identify as the iOS client (mobile status indicator)
    #[serde(default)]
    pub on_mobile: bool,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            status: default_status(),
            activity_name: None,
            activity_type: 0,
            afk: false,
            on_mobile: false,
        }
    }
}

// Default value functions
fn default_intents() -> u64 {
    Intents::default().bits()
}

fn default_api_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_gateway_version() -> u8 {
    10
}

fn default_max_attempts() -> u32 {
    10
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_status() -> String {
    "online".to_string()
}

impl BotConfig {
    /// Config with the given token and defaults for everything else
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            intents: default_intents(),
            api_base_url: default_api_base_url(),
            gateway_version: default_gateway_version(),
            memoize_guilds: false,
            reconnect: ReconnectConfig::default(),
            presence: PresenceConfig::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `DISCORD_TOKEN` is missing or a numeric variable
    /// does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?;

        let intents = match lookup("BOT_INTENTS") {
            Some(raw) => Intents::parse(&raw)
                .map_err(|_| ConfigError::InvalidValue("BOT_INTENTS", raw))?
                .bits(),
            None => default_intents(),
        };

        Ok(Self {
            token,
            intents,
            api_base_url: lookup("API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(default_api_base_url),
            gateway_version: parse_var(&lookup, "GATEWAY_VERSION")?
                .unwrap_or_else(default_gateway_version),
            memoize_guilds: parse_flag(&lookup, "MEMOIZE_GUILDS")?.unwrap_or(false),
            reconnect: ReconnectConfig {
                max_attempts: parse_var(&lookup, "RECONNECT_MAX_ATTEMPTS")?
                    .unwrap_or_else(default_max_attempts),
                base_delay_ms: parse_var(&lookup, "RECONNECT_BASE_DELAY_MS")?
                    .unwrap_or_else(default_base_delay_ms),
                max_delay_ms: parse_var(&lookup, "RECONNECT_MAX_DELAY_MS")?
                    .unwrap_or_else(default_max_delay_ms),
            },
            presence: PresenceConfig {
                status: lookup("BOT_STATUS").unwrap_or_else(default_status),
                activity_name: lookup("BOT_ACTIVITY").filter(|a| !a.is_empty()),
                ..PresenceConfig::default()
            },
        })
    }

    /// Requested intents as flags
    pub fn intents(&self) -> Intents {
        Intents::from_bits_truncate(self.intents)
    }
}

// The token must never end up in logs
impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"[redacted]")
            .field("intents", &self.intents)
            .field("api_base_url", &self.api_base_url)
            .field("gateway_version", &self.gateway_version)
            .field("memoize_guilds", &self.memoize_guilds)
            .field("reconnect", &self.reconnect)
            .field("presence", &self.presence)
            .finish()
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(None),
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue(key, raw)),
        },
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
