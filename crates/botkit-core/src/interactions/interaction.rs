//! Interaction envelope and per-type data
//!
//! The envelope is decoded first; `data` stays raw JSON until the type tag
//! says which shape it holds.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::OptionType;
use crate::entities::{Member, Message, User};
use crate::value_objects::Snowflake;

/// Interaction type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Autocomplete,
    ModalSubmit,
    Unknown(u8),
}

impl InteractionType {
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Ping => 1,
            Self::ApplicationCommand => 2,
            Self::MessageComponent => 3,
            Self::Autocomplete => 4,
            Self::ModalSubmit => 5,
            Self::Unknown(other) => other,
        }
    }
}

impl Serialize for InteractionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for InteractionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from_u8(u8::deserialize(deserializer)?))
    }
}

/// Message component type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    ActionRow,
    Button,
    StringSelect,
    TextInput,
    UserSelect,
    RoleSelect,
    MentionableSelect,
    ChannelSelect,
    Unknown(u8),
}

impl ComponentType {
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::ActionRow,
            2 => Self::Button,
            3 => Self::StringSelect,
            4 => Self::TextInput,
            5 => Self::UserSelect,
            6 => Self::RoleSelect,
            7 => Self::MentionableSelect,
            8 => Self::ChannelSelect,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::ActionRow => 1,
            Self::Button => 2,
            Self::StringSelect => 3,
            Self::TextInput => 4,
            Self::UserSelect => 5,
            Self::RoleSelect => 6,
            Self::MentionableSelect => 7,
            Self::ChannelSelect => 8,
            Self::Unknown(other) => other,
        }
    }

    /// Any of the select menu variants
    #[must_use]
    pub const fn is_select(self) -> bool {
        matches!(
            self,
            Self::StringSelect
                | Self::UserSelect
                | Self::RoleSelect
                | Self::MentionableSelect
                | Self::ChannelSelect
        )
    }
}

impl Serialize for ComponentType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ComponentType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from_u8(u8::deserialize(deserializer)?))
    }
}

/// Interaction envelope delivered by INTERACTION_CREATE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Snowflake,
    pub application_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    /// Set when invoked in a guild
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    /// Set when invoked in a DM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub token: String,
    #[serde(default)]
    pub version: u8,
    /// Message the component was attached to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_permissions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_locale: Option<String>,
}

impl Interaction {
    /// The invoking user, whether in a guild or a DM
    pub fn author(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }

    /// Decode `data` as a command invocation (also used for autocomplete)
    pub fn command_data(&self) -> Result<CommandData, serde_json::Error> {
        self.decode_data()
    }

    /// Decode `data` as a component interaction
    pub fn component_data(&self) -> Result<ComponentData, serde_json::Error> {
        self.decode_data()
    }

    /// Decode `data` as a modal submission
    pub fn modal_data(&self) -> Result<ModalData, serde_json::Error> {
        self.decode_data()
    }

    fn decode_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let data = self.data.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data)
    }
}

/// Application command invocation data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandData {
    pub id: Snowflake,
    pub name: String,
    #[serde(rename = "type", default = "default_command_type")]
    pub kind: u8,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// User or message targeted by a context menu command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Snowflake>,
}

fn default_command_type() -> u8 {
    1
}

impl CommandData {
    /// Find a top-level option by name
    pub fn option(&self, name: &str) -> Option<&CommandOption> {
        self.options.iter().find(|o| o.name == name)
    }

    /// The option the user is typing into (autocomplete)
    pub fn focused(&self) -> Option<&CommandOption> {
        fn walk(options: &[CommandOption]) -> Option<&CommandOption> {
            options
                .iter()
                .find_map(|o| if o.focused { Some(o) } else { walk(&o.options) })
        }
        walk(&self.options)
    }
}

/// Option value supplied with a command invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Nested options for sub-commands and groups
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub focused: bool,
}

impl CommandOption {
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(serde_json::Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_ref().and_then(serde_json::Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_ref().and_then(serde_json::Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_ref().and_then(serde_json::Value::as_bool)
    }

    /// Ids (user, channel, role, ...) arrive as strings
    pub fn as_snowflake(&self) -> Option<Snowflake> {
        self.as_str().and_then(|s| Snowflake::parse(s).ok())
    }
}

/// Component interaction data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentData {
    pub custom_id: String,
    pub component_type: ComponentType,
    /// Selected values (select menus only)
    #[serde(default)]
    pub values: Vec<String>,
}

/// Modal submission data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalData {
    pub custom_id: String,
    /// Action rows holding the submitted text inputs
    #[serde(default)]
    pub components: Vec<serde_json::Value>,
}

impl ModalData {
    /// Submitted text input values keyed by their custom id
    pub fn values(&self) -> HashMap<String, String> {
        self.components
            .iter()
            .filter_map(|row| row.get("components").and_then(|c| c.as_array()))
            .flatten()
            .filter_map(|input| {
                let id = input.get("custom_id")?.as_str()?;
                let value = input.get("value")?.as_str()?;
                Some((id.to_string(), value.to_string()))
            })
            .collect()
    }
}
