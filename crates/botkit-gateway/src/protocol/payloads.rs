//! Payload definitions for the op codes the client produces and consumes

use botkit_common::PresenceConfig;
use botkit_core::{Intents, Snowflake};
use serde::{Deserialize, Serialize};

/// Name announced as browser and device in Identify
pub const LIBRARY_NAME: &str = "botkit";

/// Payload for op 10 (Hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub intents: Intents,
    pub properties: IdentifyProperties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresencePayload>,
}

/// Client connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl IdentifyProperties {
    /// Properties for this library; `on_mobile` claims the iOS client
    #[must_use]
    pub fn new(on_mobile: bool) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: if on_mobile {
                "Discord iOS".to_string()
            } else {
                LIBRARY_NAME.to_string()
            },
            device: LIBRARY_NAME.to_string(),
        }
    }
}

/// Activity shown in the presence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
}

/// Payload for op 3 (Presence Update), also embedded in Identify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    /// Unix time (ms) the client went idle
    pub since: Option<u64>,
    pub activities: Vec<Activity>,
    pub status: String,
    pub afk: bool,
}

impl PresencePayload {
    /// Valid status values
    pub const VALID_STATUSES: &'static [&'static str] = &["online", "idle", "dnd", "invisible"];

    /// Check if the status is valid
    #[must_use]
    pub fn is_valid_status(&self) -> bool {
        Self::VALID_STATUSES.contains(&self.status.as_str())
    }
}

impl From<&PresenceConfig> for PresencePayload {
    fn from(config: &PresenceConfig) -> Self {
        Self {
            since: None,
            activities: config
                .activity_name
                .iter()
                .map(|name| Activity {
                    name: name.clone(),
                    kind: config.activity_type,
                })
                .collect(),
            status: config.status.clone(),
            afk: config.afk,
        }
    }
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    /// Last fully processed sequence number
    pub seq: Option<u64>,
}

/// Payload for op 8 (Request Guild Members)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestGuildMembersPayload {
    pub guild_id: Snowflake,
    /// Username prefix, empty for everyone
    pub query: String,
    /// 0 requests all members
    pub limit: u32,
}

impl RequestGuildMembersPayload {
    /// Request every member of a guild
    #[must_use]
    pub fn all(guild_id: Snowflake) -> Self {
        Self {
            guild_id,
            query: String::new(),
            limit: 0,
        }
    }
}
