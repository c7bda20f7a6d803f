//! Guild entity plus the roles, channels and members delivered with it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;
use crate::value_objects::Snowflake;

/// Guild as delivered by GUILD_CREATE
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Snowflake,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub unavailable: bool,
}

impl Guild {
    /// Find a role by id
    pub fn role(&self, id: Snowflake) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    /// Find a channel by id
    pub fn channel(&self, id: Snowflake) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Find a member by user id
    pub fn member(&self, user_id: Snowflake) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.user.as_ref().is_some_and(|u| u.id == user_id))
    }

    /// Merge a chunk of members, replacing entries for users already known
    pub fn merge_members(&mut self, chunk: Vec<Member>) {
        for member in chunk {
            let user_id = member.user.as_ref().map(|u| u.id);
            let existing = user_id.and_then(|id| {
                self.members
                    .iter()
                    .position(|m| m.user.as_ref().map(|u| u.id) == Some(id))
            });
            match existing {
                Some(index) => self.members[index] = member,
                None => self.members.push(member),
            }
        }
    }
}

/// Guild role
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub position: i32,
    /// Permission bits, serialized as a decimal string
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
}

/// Guild channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub nsfw: bool,
}

/// Guild member
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub pending: bool,
    /// Only present on interaction payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_disabled_until: Option<DateTime<Utc>>,
}

impl Member {
    /// Nickname if set, otherwise the user's display name
    pub fn display_name(&self) -> Option<&str> {
        self.nick
            .as_deref()
            .or_else(|| self.user.as_ref().map(User::display_name))
    }

    /// Whether the member is currently timed out
    pub fn is_timed_out(&self) -> bool {
        self.communication_disabled_until
            .is_some_and(|until| until > Utc::now())
    }
}

/// GUILD_DELETE payload (guild left or became unavailable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

/// GUILD_MEMBERS_CHUNK payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMembersChunk {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub chunk_index: u32,
    #[serde(default)]
    pub chunk_count: u32,
}
