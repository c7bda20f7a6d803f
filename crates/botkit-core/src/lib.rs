//! # botkit-core
//!
//! Wire model shared by the gateway runtime: identifiers, intents, entities,
//! interaction payloads and command definitions.
//! This crate performs no I/O.

pub mod entities;
pub mod interactions;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Attachment, Channel, Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia, Guild,
    GuildMembersChunk, Member, Message, MessageFlags, PartialEmoji, Role, UnavailableGuild,
    User,
};
pub use interactions::{
    ApplicationCommand, Choice, CommandData, CommandKind, CommandOption, CommandOptionDef,
    ComponentData, ComponentType, Interaction, InteractionType, ModalData, OptionType,
};
pub use value_objects::{Intents, Snowflake, SnowflakeParseError};
