//! # botkit-gateway
//!
//! Gateway client runtime: the websocket session state machine, event
//! routing, interaction dispatch and the component callback registry.
//!
//! ## Example
//!
//! ```ignore
//! use botkit_common::BotConfig;
//! use botkit_core::ApplicationCommand;
//! use botkit_gateway::Bot;
//!
//! let bot = Bot::new(BotConfig::from_env()?)?;
//! bot.add_command(ApplicationCommand::slash("ping", "Ping"), |ctx| async move {
//!     ctx.respond_text("pong").await?;
//!     Ok(())
//! });
//! bot.run().await?;
//! ```

pub mod cache;
pub mod callbacks;
pub mod client;
pub mod commands;
pub mod components;
pub mod connection;
pub mod error;
pub mod events;
pub mod gateway;
pub mod interactions;
pub mod message;
pub mod protocol;
pub mod rest;
pub mod task;

pub use client::{Bot, RegistrationHandles};
pub use components::{
    ActionRow, Button, ButtonStyle, Modal, SelectKind, SelectMenu, SelectOption, TextInput,
    TextInputStyle, View,
};
pub use connection::{BotUser, SessionPhase};
pub use error::{GatewayError, GatewayResult, TransportError, TransportResult};
pub use events::{GatewayEventType, ReadyEvent};
pub use interactions::{
    AutocompleteContext, CommandContext, ComponentContext, InteractionContext, ResponseType,
};
pub use message::{AllowedMentions, MessageBody};
pub use rest::{FileAttachment, HttpTransport, RestRequest, RestResponse, Transport};
