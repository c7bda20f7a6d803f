//! Gateway event types
//!
//! Names carried in the `t` field of dispatch frames. Names outside this list
//! still route through the `EventRouter` by their raw string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Known dispatch event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEventType {
    // Connection events
    /// Sent after a successful Identify
    Ready,
    /// Sent after a successful Resume
    Resumed,

    // Guild events
    /// Guild became available or the bot joined it
    GuildCreate,
    GuildUpdate,
    /// Bot left the guild or it became unavailable
    GuildDelete,
    /// Response to Request Guild Members
    GuildMembersChunk,
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,

    // Channel events
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,

    // Message events
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    MessageReactionAdd,
    MessageReactionRemove,

    // Interactions
    InteractionCreate,

    // Presence events
    PresenceUpdate,
    TypingStart,
    UserUpdate,
}

impl GatewayEventType {
    /// Get the wire name of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::GuildCreate => "GUILD_CREATE",
            Self::GuildUpdate => "GUILD_UPDATE",
            Self::GuildDelete => "GUILD_DELETE",
            Self::GuildMembersChunk => "GUILD_MEMBERS_CHUNK",
            Self::GuildMemberAdd => "GUILD_MEMBER_ADD",
            Self::GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
            Self::GuildMemberRemove => "GUILD_MEMBER_REMOVE",
            Self::ChannelCreate => "CHANNEL_CREATE",
            Self::ChannelUpdate => "CHANNEL_UPDATE",
            Self::ChannelDelete => "CHANNEL_DELETE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageUpdate => "MESSAGE_UPDATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::MessageReactionAdd => "MESSAGE_REACTION_ADD",
            Self::MessageReactionRemove => "MESSAGE_REACTION_REMOVE",
            Self::InteractionCreate => "INTERACTION_CREATE",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
            Self::TypingStart => "TYPING_START",
            Self::UserUpdate => "USER_UPDATE",
        }
    }

    /// Parse an event type from its wire name
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "READY" => Some(Self::Ready),
            "RESUMED" => Some(Self::Resumed),
            "GUILD_CREATE" => Some(Self::GuildCreate),
            "GUILD_UPDATE" => Some(Self::GuildUpdate),
            "GUILD_DELETE" => Some(Self::GuildDelete),
            "GUILD_MEMBERS_CHUNK" => Some(Self::GuildMembersChunk),
            "GUILD_MEMBER_ADD" => Some(Self::GuildMemberAdd),
            "GUILD_MEMBER_UPDATE" => Some(Self::GuildMemberUpdate),
            "GUILD_MEMBER_REMOVE" => Some(Self::GuildMemberRemove),
            "CHANNEL_CREATE" => Some(Self::ChannelCreate),
            "CHANNEL_UPDATE" => Some(Self::ChannelUpdate),
            "CHANNEL_DELETE" => Some(Self::ChannelDelete),
            "MESSAGE_CREATE" => Some(Self::MessageCreate),
            "MESSAGE_UPDATE" => Some(Self::MessageUpdate),
            "MESSAGE_DELETE" => Some(Self::MessageDelete),
            "MESSAGE_REACTION_ADD" => Some(Self::MessageReactionAdd),
            "MESSAGE_REACTION_REMOVE" => Some(Self::MessageReactionRemove),
            "INTERACTION_CREATE" => Some(Self::InteractionCreate),
            "PRESENCE_UPDATE" => Some(Self::PresenceUpdate),
            "TYPING_START" => Some(Self::TypingStart),
            "USER_UPDATE" => Some(Self::UserUpdate),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<GatewayEventType> for String {
    fn from(event: GatewayEventType) -> Self {
        event.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        assert_eq!(GatewayEventType::Ready.as_str(), "READY");
        assert_eq!(GatewayEventType::GuildMembersChunk.as_str(), "GUILD_MEMBERS_CHUNK");
        assert_eq!(
            GatewayEventType::from_str("INTERACTION_CREATE"),
            Some(GatewayEventType::InteractionCreate)
        );
        assert_eq!(GatewayEventType::from_str("AUTO_MODERATION_ACTION_EXECUTION"), None);
    }

    #[test]
    fn test_serde_matches_as_str() {
        let json = serde_json::to_string(&GatewayEventType::MessageReactionAdd).unwrap();
        assert_eq!(json, format!("\"{}\"", GatewayEventType::MessageReactionAdd.as_str()));
    }
}
