//! Partial emoji as used on buttons and select options

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Custom emoji reference, or a unicode emoji carried in `name`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialEmoji {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub animated: bool,
}

impl PartialEmoji {
    /// Unicode emoji
    pub fn unicode(emoji: impl Into<String>) -> Self {
        Self {
            name: Some(emoji.into()),
            ..Self::default()
        }
    }

    /// Custom guild emoji
    pub fn custom(id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
            animated: false,
        }
    }
}
