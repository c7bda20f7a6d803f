//! Application command definitions submitted for registration

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value_objects::Snowflake;

/// Kind of application command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CommandKind {
    /// Slash command
    #[default]
    ChatInput = 1,
    /// Right-click on a user
    User = 2,
    /// Right-click on a message
    Message = 3,
}

impl Serialize for CommandKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for CommandKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            1 => Ok(Self::ChatInput),
            2 => Ok(Self::User),
            3 => Ok(Self::Message),
            other => Err(serde::de::Error::custom(format!("invalid command type: {other}"))),
        }
    }
}

/// Command option value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OptionType {
    SubCommand = 1,
    SubCommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Number = 10,
    Attachment = 11,
}

impl OptionType {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::SubCommand),
            2 => Some(Self::SubCommandGroup),
            3 => Some(Self::String),
            4 => Some(Self::Integer),
            5 => Some(Self::Boolean),
            6 => Some(Self::User),
            7 => Some(Self::Channel),
            8 => Some(Self::Role),
            9 => Some(Self::Mentionable),
            10 => Some(Self::Number),
            11 => Some(Self::Attachment),
            _ => None,
        }
    }
}

impl Serialize for OptionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for OptionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid option type: {value}")))
    }
}

/// Predefined choice for a string, integer or number option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: serde_json::Value,
}

impl Choice {
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Option declared on a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOptionDef {
    #[serde(rename = "type")]
    pub kind: OptionType,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_types: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub autocomplete: bool,
}

impl CommandOptionDef {
    pub fn new(kind: OptionType, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            choices: Vec::new(),
            options: Vec::new(),
            channel_types: Vec::new(),
            min_value: None,
            max_value: None,
            autocomplete: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn option(mut self, option: CommandOptionDef) -> Self {
        self.options.push(option);
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }
}

/// Command definition sent to the create-command endpoint
///
/// `guild_id` selects the scope: unset registers a global command, set
/// registers it for that guild only. It is part of the route, not the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationCommand {
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dm_permission: Option<bool>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nsfw: bool,
    #[serde(skip)]
    pub guild_id: Option<Snowflake>,
}

impl ApplicationCommand {
    /// Slash command
    pub fn slash(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::ChatInput,
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            default_member_permissions: None,
            dm_permission: None,
            nsfw: false,
            guild_id: None,
        }
    }

    /// Context menu command on users or messages (no description)
    pub fn context_menu(kind: CommandKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            ..Self::slash(name, "")
        }
    }

    pub fn option(mut self, option: CommandOptionDef) -> Self {
        self.options.push(option);
        self
    }

    /// Scope the command to a single guild
    pub fn guild(mut self, guild_id: Snowflake) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn permissions(mut self, bits: u64) -> Self {
        self.default_member_permissions = Some(bits.to_string());
        self
    }

    pub fn is_global(&self) -> bool {
        self.guild_id.is_none()
    }
}
