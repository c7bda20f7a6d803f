//! Event payload definitions for events the runtime decodes itself

use botkit_core::{Snowflake, UnavailableGuild, User};
use serde::{Deserialize, Serialize};

/// READY event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    pub v: u8,
    /// The bot account
    pub user: User,
    pub session_id: String,
    /// Url to dial when resuming this session
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
    pub application: PartialApplication,
    /// Guilds the bot is in, initially unavailable
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialApplication {
    pub id: Snowflake,
    #[serde(default)]
    pub flags: u64,
}

/// MESSAGE_DELETE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// GUILD_MEMBER_REMOVE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberRemoveEvent {
    pub guild_id: Snowflake,
    pub user: User,
}
