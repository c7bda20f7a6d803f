//! Entities - wire models for objects the gateway and REST API deliver

mod embed;
mod emoji;
mod guild;
mod message;
mod user;

pub use embed::{Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia};
pub use emoji::PartialEmoji;
pub use guild::{Channel, Guild, GuildMembersChunk, Member, Role, UnavailableGuild};
pub use message::{Attachment, Message, MessageFlags};
pub use user::User;
