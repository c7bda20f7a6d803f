//! Interactions - inbound interaction payloads and outbound command definitions

mod command;
mod interaction;

pub use command::{ApplicationCommand, Choice, CommandKind, CommandOptionDef, OptionType};
pub use interaction::{
    CommandData, CommandOption, ComponentData, ComponentType, Interaction, InteractionType,
    ModalData,
};
