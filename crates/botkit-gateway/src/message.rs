//! Outbound message bodies
//!
//! Builds the JSON body shared by channel messages, interaction responses
//! and follow-ups. Rendering a view registers its callbacks, so bodies are
//! consumed by `into_body`.

use botkit_core::{Embed, MessageFlags, Snowflake};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::callbacks::ComponentRegistry;
use crate::components::View;
use crate::rest::FileAttachment;

/// Embeds per message
pub const MAX_EMBEDS: usize = 10;

/// Ids per allowed-mentions list
pub const MAX_ALLOWED_MENTIONS: usize = 100;

/// Which mentions in the content may ping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllowedMentions {
    /// Mention kinds parsed from content: "roles", "users", "everyone"
    pub parse: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<Snowflake>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Snowflake>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub replied_user: bool,
}

impl AllowedMentions {
    /// Suppress every ping
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    pub fn parse<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parse: kinds.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn users(mut self, users: impl IntoIterator<Item = Snowflake>) -> Self {
        self.users.extend(users);
        self
    }

    #[must_use]
    pub fn roles(mut self, roles: impl IntoIterator<Item = Snowflake>) -> Self {
        self.roles.extend(roles);
        self
    }

    fn capped(mut self) -> Self {
        for (list, name) in [(&mut self.users, "users"), (&mut self.roles, "roles")] {
            if list.len() > MAX_ALLOWED_MENTIONS {
                tracing::warn!(
                    list = name,
                    len = list.len(),
                    "Allowed mentions are capped at 100 ids"
                );
                list.truncate(MAX_ALLOWED_MENTIONS);
            }
        }
        self
    }
}

/// Message content and attachments
#[derive(Debug, Clone, Default)]
pub struct MessageBody {
    content: Option<String>,
    embed: Option<Embed>,
    embeds: Vec<Embed>,
    allowed_mentions: Option<AllowedMentions>,
    tts: bool,
    ephemeral: bool,
    suppress_embeds: bool,
    view: Option<View>,
    files: Vec<FileAttachment>,
    reply_to: Option<Snowflake>,
}

impl MessageBody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain text body
    pub fn text(content: impl Into<String>) -> Self {
        Self::new().content(content)
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Primary embed, sent before any added with `embeds`
    #[must_use]
    pub fn embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    #[must_use]
    pub fn embeds(mut self, embeds: impl IntoIterator<Item = Embed>) -> Self {
        self.embeds.extend(embeds);
        self
    }

    #[must_use]
    pub fn allowed_mentions(mut self, mentions: AllowedMentions) -> Self {
        self.allowed_mentions = Some(mentions);
        self
    }

    #[must_use]
    pub fn tts(mut self) -> Self {
        self.tts = true;
        self
    }

    /// Only the invoking user sees the message (interaction responses only)
    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    #[must_use]
    pub fn suppress_embeds(mut self) -> Self {
        self.suppress_embeds = true;
        self
    }

    #[must_use]
    pub fn view(mut self, view: View) -> Self {
        self.view = Some(view);
        self
    }

    #[must_use]
    pub fn file(mut self, file: FileAttachment) -> Self {
        self.files.push(file);
        self
    }

    #[must_use]
    pub fn reply_to(mut self, message_id: Snowflake) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    pub fn flags(&self) -> MessageFlags {
        let mut flags = MessageFlags::empty();
        if self.ephemeral {
            flags |= MessageFlags::EPHEMERAL;
        }
        if self.suppress_embeds {
            flags |= MessageFlags::SUPPRESS_EMBEDS;
        }
        flags
    }

    /// Wire body plus the files to upload with it
    pub fn into_body(self, registry: &ComponentRegistry) -> (Value, Vec<FileAttachment>) {
        let flags = self.flags();
        let mut body = Map::new();

        if let Some(content) = self.content.filter(|c| !c.is_empty()) {
            body.insert("content".into(), json!(content));
        }

        let mut embeds: Vec<Embed> = self
            .embed
            .into_iter()
            .chain(self.embeds)
            .filter(|e| !e.is_empty())
            .collect();
        if embeds.len() > MAX_EMBEDS {
            tracing::warn!(embeds = embeds.len(), "Dropping embeds beyond the first 10");
            embeds.truncate(MAX_EMBEDS);
        }
        if !embeds.is_empty() {
            body.insert("embeds".into(), json!(embeds));
        }

        if let Some(mentions) = self.allowed_mentions {
            body.insert("allowed_mentions".into(), json!(mentions.capped()));
        }
        if self.tts {
            body.insert("tts".into(), json!(true));
        }
        if !flags.is_empty() {
            body.insert("flags".into(), json!(flags));
        }
        if let Some(view) = self.view {
            body.insert("components".into(), json!(view.into_components(registry)));
        }
        if let Some(message_id) = self.reply_to {
            body.insert(
                "message_reference".into(),
                json!({ "message_id": message_id }),
            );
        }

        let files: Vec<FileAttachment> = self
            .files
            .into_iter()
            .filter(|f| !f.content.is_empty())
            .collect();
        if !files.is_empty() {
            let attachments: Vec<Value> = files
                .iter()
                .enumerate()
                .map(|(id, file)| {
                    json!({
                        "id": id,
                        "filename": file.name,
                        "description": file.description,
                    })
                })
                .collect();
            body.insert("attachments".into(), json!(attachments));
        }

        (Value::Object(body), files)
    }
}

impl From<&str> for MessageBody {
    fn from(content: &str) -> Self {
        Self::text(content)
    }
}

impl From<String> for MessageBody {
    fn from(content: String) -> Self {
        Self::text(content)
    }
}
