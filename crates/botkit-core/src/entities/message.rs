//! Message entity - a chat message as delivered by MESSAGE_CREATE

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Embed, Member, User};
use crate::value_objects::Snowflake;

bitflags! {
    /// Message flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MessageFlags: u64 {
        const CROSSPOSTED            = 1 << 0;
        const IS_CROSSPOST           = 1 << 1;
        const SUPPRESS_EMBEDS        = 1 << 2;
        const SOURCE_MESSAGE_DELETED = 1 << 3;
        const URGENT                 = 1 << 4;
        const HAS_THREAD             = 1 << 5;
        /// Only visible to the user who triggered the interaction
        const EPHEMERAL              = 1 << 6;
        const LOADING                = 1 << 7;
        const SUPPRESS_NOTIFICATIONS = 1 << 12;
    }
}

impl Serialize for MessageFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for MessageFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(MessageFlags::from_bits_truncate(u64::deserialize(deserializer)?))
    }
}

/// Chat message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub author: User,
    /// Partial member, present on guild messages from the gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub flags: MessageFlags,
    /// Component tree, kept as raw JSON
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<serde_json::Value>,
}

impl Message {
    /// Check if message has been edited
    #[inline]
    pub fn is_edited(&self) -> bool {
        self.edited_timestamp.is_some()
    }

    /// Whether the message was sent in a guild channel
    #[inline]
    pub fn is_guild(&self) -> bool {
        self.guild_id.is_some()
    }

    /// Get a truncated preview of the message
    pub fn preview(&self, max_len: usize) -> &str {
        if self.content.len() <= max_len {
            &self.content
        } else {
            let mut end = max_len;
            while !self.content.is_char_boundary(end) {
                end -= 1;
            }
            &self.content[..end]
        }
    }
}

/// File attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub proxy_url: String,
}

impl Attachment {
    /// Check if attachment is an image
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_ref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_message_create() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "id": "334385199974967042",
            "channel_id": "290926798999357250",
            "guild_id": "290926798999357250",
            "author": {"id": "53908099506183680", "username": "Mason", "discriminator": "9999"},
            "content": "Supa Hot",
            "timestamp": "2017-07-11T17:27:07.299000+00:00",
            "edited_timestamp": null,
            "flags": 64,
            "attachments": [{"id": "1", "filename": "a.png", "content_type": "image/png", "size": 10, "url": "u", "proxy_url": "p"}]
        }))
        .unwrap();

        assert!(msg.is_guild());
        assert!(!msg.is_edited());
        assert!(msg.flags.contains(MessageFlags::EPHEMERAL));
        assert!(msg.attachments[0].is_image());
        assert_eq!(msg.author.tag(), "Mason#9999");
    }

    #[test]
    fn test_preview_respects_char_boundary() {
        let msg = Message {
            content: "héllo".to_string(),
            ..Message::default()
        };
        assert_eq!(msg.preview(2), "h");
        assert_eq!(msg.preview(100), "héllo");
    }

    #[test]
    fn test_flags_wire_values() {
        assert_eq!(MessageFlags::EPHEMERAL.bits(), 64);
        assert_eq!(MessageFlags::SUPPRESS_EMBEDS.bits(), 4);
    }
}
