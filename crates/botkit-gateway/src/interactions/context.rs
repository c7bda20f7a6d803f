//! Interaction contexts
//!
//! Handed to command, component and autocomplete callbacks. Every context
//! can answer the interaction it was built from.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use botkit_core::{
    Choice, CommandData, CommandOption, ComponentType, Interaction, Message, MessageFlags,
    Snowflake, User,
};
use serde_json::{json, Value};

use crate::callbacks::ComponentRegistry;
use crate::components::Modal;
use crate::connection::BotUser;
use crate::error::GatewayResult;
use crate::message::MessageBody;
use crate::rest::{routes, FileAttachment, RestRequest, Transport};

/// Interaction callback response types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    Pong,
    ChannelMessage,
    DeferredChannelMessage,
    DeferredUpdateMessage,
    UpdateMessage,
    AutocompleteResult,
    Modal,
}

impl ResponseType {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Pong => 1,
            Self::ChannelMessage => 4,
            Self::DeferredChannelMessage => 5,
            Self::DeferredUpdateMessage => 6,
            Self::UpdateMessage => 7,
            Self::AutocompleteResult => 8,
            Self::Modal => 9,
        }
    }
}

/// Choices per autocomplete response
pub const MAX_AUTOCOMPLETE_CHOICES: usize = 25;

/// Base context for every interaction
#[derive(Clone)]
pub struct InteractionContext {
    pub interaction: Arc<Interaction>,
    /// Session snapshot taken when the interaction arrived
    pub bot: BotUser,
    transport: Arc<dyn Transport>,
    components: ComponentRegistry,
}

impl InteractionContext {
    pub(crate) fn new(
        interaction: Arc<Interaction>,
        bot: BotUser,
        transport: Arc<dyn Transport>,
        components: ComponentRegistry,
    ) -> Self {
        Self {
            interaction,
            bot,
            transport,
            components,
        }
    }

    pub fn id(&self) -> Snowflake {
        self.interaction.id
    }

    pub fn token(&self) -> &str {
        &self.interaction.token
    }

    pub fn application_id(&self) -> Snowflake {
        self.interaction.application_id
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        self.interaction.guild_id
    }

    pub fn channel_id(&self) -> Option<Snowflake> {
        self.interaction.channel_id
    }

    /// The user who triggered the interaction
    pub fn author(&self) -> Option<&User> {
        self.interaction.author()
    }

    /// Registry used to render views in responses
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    async fn callback(
        &self,
        kind: ResponseType,
        data: Option<Value>,
        files: Vec<FileAttachment>,
    ) -> GatewayResult<()> {
        let mut body = json!({ "type": kind.as_u8() });
        if let Some(data) = data {
            body["data"] = data;
        }
        self.callback_raw(body, files).await
    }

    async fn callback_raw(&self, body: Value, files: Vec<FileAttachment>) -> GatewayResult<()> {
        let request = RestRequest::post(routes::interaction_callback(self.id(), self.token()))
            .json(body)
            .files(files);
        self.transport.execute(request).await?.error_for_status()?;
        Ok(())
    }

    /// Answer with a message (type 4)
    pub async fn respond(&self, body: impl Into<MessageBody>) -> GatewayResult<()> {
        let (data, files) = body.into().into_body(&self.components);
        self.callback(ResponseType::ChannelMessage, Some(data), files)
            .await
    }

    pub async fn respond_text(&self, content: impl Into<String>) -> GatewayResult<()> {
        self.respond(MessageBody::text(content)).await
    }

    /// Acknowledge now and answer later with `edit_original` (type 5)
    pub async fn defer(&self, ephemeral: bool) -> GatewayResult<()> {
        let data = ephemeral.then(|| json!({ "flags": MessageFlags::EPHEMERAL.bits() }));
        self.callback(ResponseType::DeferredChannelMessage, data, Vec::new())
            .await
    }

    /// Plain acknowledgement (type 1)
    pub async fn ack(&self) -> GatewayResult<()> {
        self.callback(ResponseType::Pong, None, Vec::new()).await
    }

    /// Answer with a modal form (type 9)
    pub async fn send_modal(&self, modal: Modal) -> GatewayResult<()> {
        let body = modal.into_response(&self.components);
        self.callback_raw(body, Vec::new()).await
    }

    /// Answer an autocomplete query (type 8); more than 25 choices are dropped
    pub async fn send_autocomplete(&self, mut choices: Vec<Choice>) -> GatewayResult<()> {
        if choices.len() > MAX_AUTOCOMPLETE_CHOICES {
            tracing::warn!(choices = choices.len(), "Autocomplete is capped at 25 choices");
            choices.truncate(MAX_AUTOCOMPLETE_CHOICES);
        }
        self.callback(
            ResponseType::AutocompleteResult,
            Some(json!({ "choices": choices })),
            Vec::new(),
        )
        .await
    }

    /// Send an additional message after the initial response
    pub async fn followup(&self, body: impl Into<MessageBody>) -> GatewayResult<Message> {
        let (data, files) = body.into().into_body(&self.components);
        let request = RestRequest::post(routes::webhook(self.application_id(), self.token()))
            .json(data)
            .files(files);
        let response = self.transport.execute(request).await?.error_for_status()?;
        Ok(response.json()?)
    }

    /// Replace the initial response
    pub async fn edit_original(&self, body: impl Into<MessageBody>) -> GatewayResult<Message> {
        let (data, files) = body.into().into_body(&self.components);
        let request =
            RestRequest::patch(routes::webhook_original(self.application_id(), self.token()))
                .json(data)
                .files(files);
        let response = self.transport.execute(request).await?.error_for_status()?;
        Ok(response.json()?)
    }

    pub async fn delete_original(&self) -> GatewayResult<()> {
        let request =
            RestRequest::delete(routes::webhook_original(self.application_id(), self.token()));
        self.transport.execute(request).await?.error_for_status()?;
        Ok(())
    }
}

impl std::fmt::Debug for InteractionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionContext")
            .field("id", &self.interaction.id)
            .field("kind", &self.interaction.kind)
            .field("guild_id", &self.interaction.guild_id)
            .finish_non_exhaustive()
    }
}

/// Context for a slash or context-menu command
#[derive(Debug, Clone)]
pub struct CommandContext {
    inner: InteractionContext,
    pub data: CommandData,
}

impl CommandContext {
    pub(crate) fn new(inner: InteractionContext, data: CommandData) -> Self {
        Self { inner, data }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn options(&self) -> &[CommandOption] {
        &self.data.options
    }

    pub fn option(&self, name: &str) -> Option<&CommandOption> {
        self.data.option(name)
    }
}

impl Deref for CommandContext {
    type Target = InteractionContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Context for a component interaction or modal submission
#[derive(Debug, Clone)]
pub struct ComponentContext {
    inner: InteractionContext,
    pub custom_id: String,
    /// Absent for modal submissions
    pub component_type: Option<ComponentType>,
    /// Selected values (select menus)
    pub values: Vec<String>,
    /// Submitted inputs keyed by input custom id (modals)
    pub modal_values: HashMap<String, String>,
}

impl ComponentContext {
    pub(crate) fn new(inner: InteractionContext, custom_id: String) -> Self {
        Self {
            inner,
            custom_id,
            component_type: None,
            values: Vec::new(),
            modal_values: HashMap::new(),
        }
    }

    /// Message the component is attached to
    pub fn message(&self) -> Option<&Message> {
        self.inner.interaction.message.as_ref()
    }

    /// Edit the message the component is attached to (type 7)
    pub async fn update_message(&self, body: impl Into<MessageBody>) -> GatewayResult<()> {
        let (data, files) = body.into().into_body(&self.inner.components);
        self.inner
            .callback(ResponseType::UpdateMessage, Some(data), files)
            .await
    }

    /// Acknowledge without visibly responding (type 6)
    pub async fn defer_update(&self) -> GatewayResult<()> {
        self.inner
            .callback(ResponseType::DeferredUpdateMessage, None, Vec::new())
            .await
    }
}

impl Deref for ComponentContext {
    type Target = InteractionContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Context for an autocomplete query
#[derive(Debug, Clone)]
pub struct AutocompleteContext {
    inner: InteractionContext,
    pub data: CommandData,
}

impl AutocompleteContext {
    pub(crate) fn new(inner: InteractionContext, data: CommandData) -> Self {
        Self { inner, data }
    }

    /// The option being typed into
    pub fn focused(&self) -> Option<&CommandOption> {
        self.data.focused()
    }

    /// Current partial input of the focused option
    pub fn query(&self) -> &str {
        self.focused()
            .and_then(CommandOption::as_str)
            .unwrap_or_default()
    }
}

impl Deref for AutocompleteContext {
    type Target = InteractionContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
fn test_interaction(kind: u8, data: Value) -> Interaction {
    serde_json::from_value(json!({
        "id": "100",
        "application_id": "200",
        "type": kind,
        "token": "tok",
        "channel_id": "300",
        "data": data,
    }))
    .unwrap()
}

#[cfg(test)]
pub(crate) fn test_component_context(custom_id: &str) -> ComponentContext {
    use crate::connection::SessionState;
    use crate::rest::recording::RecordingTransport;

    let interaction = test_interaction(
        3,
        json!({"custom_id": custom_id, "component_type": 2}),
    );
    let inner = InteractionContext::new(
        Arc::new(interaction),
        BotUser::default(),
        Arc::new(RecordingTransport::new()),
        ComponentRegistry::new(Arc::new(SessionState::new())),
    );
    ComponentContext::new(inner, custom_id.to_string())
}
