//! User entity - an account as seen on the wire

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Platform user (humans and bots)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub mfa_enabled: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub flags: u64,
}

impl User {
    /// Get the legacy tag: username#discriminator, or the bare username
    /// for accounts migrated to unique usernames
    pub fn tag(&self) -> String {
        if self.discriminator.is_empty() || self.discriminator == "0" {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }

    /// Name to show in UIs
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }

    /// Mention markup for message content
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Get avatar CDN URL or the default avatar URL
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => format!("https://cdn.discordapp.com/avatars/{}/{}.png", self.id, hash),
            None => format!(
                "https://cdn.discordapp.com/embed/avatars/{}.png",
                self.default_avatar_index()
            ),
        }
    }

    fn default_avatar_index(&self) -> u64 {
        match self.discriminator.parse::<u64>() {
            Ok(discriminator) if discriminator != 0 => discriminator % 5,
            _ => (self.id.get() >> 22) % 6,
        }
    }
}
