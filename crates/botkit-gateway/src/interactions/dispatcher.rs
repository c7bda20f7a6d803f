//! Interaction dispatcher
//!
//! Decodes INTERACTION_CREATE payloads and routes them by type to command
//! handlers, component callbacks and the autocomplete hook.

use std::future::Future;
use std::sync::Arc;

use botkit_common::HandlerResult;
use botkit_core::{ComponentType, Interaction, InteractionType};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::task::JoinHandle;

use super::{AutocompleteContext, CommandContext, ComponentContext, InteractionContext};
use crate::callbacks::{ComponentCallback, ComponentRegistry};
use crate::commands::CommandRegistry;
use crate::connection::BotUser;
use crate::rest::Transport;
use crate::task::{spawn_handler, HandlerKind};

/// Runs for every interaction before type-specific routing
pub type InteractionHandler =
    Arc<dyn Fn(BotUser, Arc<Interaction>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

pub type AutocompleteHandler =
    Arc<dyn Fn(AutocompleteContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

pub struct InteractionDispatcher {
    transport: Arc<dyn Transport>,
    commands: Arc<CommandRegistry>,
    components: ComponentRegistry,
    generic: RwLock<Option<InteractionHandler>>,
    autocomplete: RwLock<Option<AutocompleteHandler>>,
}

impl InteractionDispatcher {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        commands: Arc<CommandRegistry>,
        components: ComponentRegistry,
    ) -> Self {
        Self {
            transport,
            commands,
            components,
            generic: RwLock::new(None),
            autocomplete: RwLock::new(None),
        }
    }

    pub fn set_interaction_handler<F, Fut>(&self, f: F)
    where
        F: Fn(BotUser, Arc<Interaction>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: InteractionHandler =
            Arc::new(move |bot: BotUser, interaction: Arc<Interaction>| f(bot, interaction).boxed());
        *self.generic.write() = Some(handler);
    }

    pub fn set_autocomplete_handler<F, Fut>(&self, f: F)
    where
        F: Fn(AutocompleteContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: AutocompleteHandler =
            Arc::new(move |ctx: AutocompleteContext| f(ctx).boxed());
        *self.autocomplete.write() = Some(handler);
    }

    /// Route one interaction payload; returns the spawned handler tasks
    pub fn route(&self, payload: Value, bot: BotUser) -> Vec<JoinHandle<()>> {
        let interaction: Arc<Interaction> = match serde_json::from_value(payload) {
            Ok(interaction) => Arc::new(interaction),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed interaction payload");
                return Vec::new();
            }
        };
        tracing::debug!(
            interaction_id = %interaction.id,
            kind = ?interaction.kind,
            "Routing interaction"
        );

        let mut tasks = Vec::new();

        let generic = self.generic.read().clone();
        if let Some(handler) = generic {
            let bot = bot.clone();
            let interaction = interaction.clone();
            tasks.push(spawn_handler(HandlerKind::Interaction, "interaction", async move {
                handler(bot, interaction).await
            }));
        }

        let ctx = InteractionContext::new(
            interaction.clone(),
            bot,
            self.transport.clone(),
            self.components.clone(),
        );

        let task = match interaction.kind {
            InteractionType::Ping => None,
            InteractionType::ApplicationCommand => self.route_command(ctx),
            InteractionType::MessageComponent => self.route_component(ctx),
            InteractionType::Autocomplete => self.route_autocomplete(ctx),
            InteractionType::ModalSubmit => self.route_modal(ctx),
            InteractionType::Unknown(kind) => {
                tracing::warn!(kind, "Unrecognised interaction type");
                None
            }
        };
        tasks.extend(task);
        tasks
    }

    fn route_command(&self, ctx: InteractionContext) -> Option<JoinHandle<()>> {
        let data = match ctx.interaction.command_data() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed command data");
                return None;
            }
        };

        let Some(handler) = self.commands.handler(data.id) else {
            tracing::debug!(command = %data.name, command_id = %data.id, "No handler for command");
            return None;
        };

        let name = data.name.clone();
        let ctx = CommandContext::new(ctx, data);
        Some(spawn_handler(HandlerKind::Command, name, async move {
            handler(ctx).await
        }))
    }

    fn route_component(&self, ctx: InteractionContext) -> Option<JoinHandle<()>> {
        let data = match ctx.interaction.component_data() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed component data");
                return None;
            }
        };

        let mut ctx = ComponentContext::new(ctx, data.custom_id.clone());
        ctx.component_type = Some(data.component_type);
        ctx.values = data.values;

        self.components
            .timeouts()
            .record_context(&data.custom_id, ctx.clone());

        let callback = self.components.callbacks().peek(&data.custom_id)?;
        let accepted = match (&callback, data.component_type) {
            (ComponentCallback::Click(_), ComponentType::Button) => true,
            (ComponentCallback::Selection(_), kind) => kind.is_select(),
            _ => false,
        };
        if !accepted {
            tracing::warn!(
                custom_id = %data.custom_id,
                callback = callback.name(),
                component_type = ?data.component_type,
                "Callback does not match component type"
            );
            return None;
        }

        Some(spawn_handler(
            HandlerKind::Component,
            data.custom_id,
            callback.invoke(ctx),
        ))
    }

    fn route_autocomplete(&self, ctx: InteractionContext) -> Option<JoinHandle<()>> {
        let handler = self.autocomplete.read().clone()?;
        let data = match ctx.interaction.command_data() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed autocomplete data");
                return None;
            }
        };

        let name = data.name.clone();
        let ctx = AutocompleteContext::new(ctx, data);
        Some(spawn_handler(HandlerKind::Autocomplete, name, async move {
            handler(ctx).await
        }))
    }

    fn route_modal(&self, ctx: InteractionContext) -> Option<JoinHandle<()>> {
        let data = match ctx.interaction.modal_data() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed modal data");
                return None;
            }
        };

        // One-shot: whoever consumes first owns the entry
        let callback = self.components.callbacks().consume(&data.custom_id)?;
        self.components.timeouts().cancel(&data.custom_id);

        let mut ctx = ComponentContext::new(ctx, data.custom_id.clone());
        ctx.modal_values = data.values();

        Some(spawn_handler(
            HandlerKind::Modal,
            data.custom_id,
            callback.invoke(ctx),
        ))
    }
}

impl std::fmt::Debug for InteractionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionDispatcher")
            .field("commands", &self.commands)
            .field("components", &self.components)
            .field("generic", &self.generic.read().is_some())
            .field("autocomplete", &self.autocomplete.read().is_some())
            .finish_non_exhaustive()
    }
}
