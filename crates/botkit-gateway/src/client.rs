//! Bot facade
//!
//! Wires the session, routers and registries together and exposes the
//! registration surface user code talks to.

use std::future::Future;
use std::sync::Arc;

use botkit_common::{BotConfig, HandlerResult};
use botkit_core::{
    ApplicationCommand, Guild, Interaction, Message, Snowflake, UnavailableGuild,
};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use crate::cache::GuildCache;
use crate::callbacks::ComponentRegistry;
use crate::commands::{CommandRegistry, PendingCommand};
use crate::connection::{BotUser, SessionState};
use crate::error::GatewayResult;
use crate::events::{EventRouter, GatewayEventType, ReadyEvent};
use crate::gateway::GatewaySession;
use crate::interactions::{AutocompleteContext, CommandContext, InteractionDispatcher};
use crate::message::MessageBody;
use crate::protocol::{GatewayMessage, PresencePayload, RequestGuildMembersPayload};
use crate::rest::{routes, HttpTransport, RestRequest, Transport};

/// Join handles of command registrations started by `add_commands`
pub type RegistrationHandles = Vec<JoinHandle<GatewayResult<Snowflake>>>;

struct BotInner {
    config: BotConfig,
    transport: Arc<dyn Transport>,
    state: Arc<SessionState>,
    router: Arc<EventRouter>,
    dispatcher: Arc<InteractionDispatcher>,
    commands: Arc<CommandRegistry>,
    components: ComponentRegistry,
    cache: Arc<GuildCache>,
}

/// Bot client
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    /// Create a bot talking to the REST API named in `config`
    pub fn new(config: BotConfig) -> GatewayResult<Self> {
        let transport = HttpTransport::new(config.api_base_url.clone(), &config.token)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a bot over a custom control-channel transport
    #[must_use]
    pub fn with_transport(config: BotConfig, transport: Arc<dyn Transport>) -> Self {
        let state = Arc::new(SessionState::new());
        let commands = Arc::new(CommandRegistry::new());
        let components = ComponentRegistry::new(state.clone());
        let dispatcher = Arc::new(InteractionDispatcher::new(
            transport.clone(),
            commands.clone(),
            components.clone(),
        ));

        Self {
            inner: Arc::new(BotInner {
                config,
                transport,
                state,
                router: Arc::new(EventRouter::new()),
                dispatcher,
                commands,
                components,
                cache: Arc::new(GuildCache::new()),
            }),
        }
    }

    // === Event handlers ===

    pub fn on_ready<F, Fut>(&self, f: F)
    where
        F: Fn(BotUser, ReadyEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_event(GatewayEventType::Ready, f);
    }

    pub fn on_message<F, Fut>(&self, f: F)
    where
        F: Fn(BotUser, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_event(GatewayEventType::MessageCreate, f);
    }

    /// Called for every GUILD_CREATE, including guilds streamed after READY
    pub fn on_guild_join<F, Fut>(&self, f: F)
    where
        F: Fn(BotUser, Guild) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_event(GatewayEventType::GuildCreate, f);
    }

    pub fn on_guild_leave<F, Fut>(&self, f: F)
    where
        F: Fn(BotUser, UnavailableGuild) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_event(GatewayEventType::GuildDelete, f);
    }

    /// Register a typed handler for any dispatch event name
    pub fn on_event<E, F, Fut>(&self, event: impl Into<String>, f: F)
    where
        E: DeserializeOwned + Send + 'static,
        F: Fn(BotUser, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.inner.router.on(event, f);
    }

    /// Called first for every interaction, before type-specific routing
    pub fn on_interaction<F, Fut>(&self, f: F)
    where
        F: Fn(BotUser, Arc<Interaction>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.inner.dispatcher.set_interaction_handler(f);
    }

    pub fn on_autocomplete<F, Fut>(&self, f: F)
    where
        F: Fn(AutocompleteContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.inner.dispatcher.set_autocomplete_handler(f);
    }

    /// Observe every inbound gateway frame
    pub fn on_socket_receive<F, Fut>(&self, f: F)
    where
        F: Fn(BotUser, GatewayMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.inner.router.set_raw_observer(f);
    }

    // === Commands ===

    /// Add one command; see `add_commands`
    pub fn add_command<F, Fut>(&self, definition: ApplicationCommand, f: F) -> RegistrationHandles
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_commands([PendingCommand::new(definition, f)])
    }

    /// Queue commands for registration
    ///
    /// Before the first READY they are registered when it arrives and the
    /// returned list is empty. Afterwards they are registered immediately.
    pub fn add_commands(
        &self,
        commands: impl IntoIterator<Item = PendingCommand>,
    ) -> RegistrationHandles {
        let inner = &self.inner;
        inner.commands.enqueue(commands);

        match inner.state.application_id() {
            Some(application_id) if inner.state.is_bootstrapped() => {
                inner.commands.flush(&inner.transport, application_id)
            }
            _ => Vec::new(),
        }
    }

    // === Control channel ===

    /// Post a message to a channel
    pub async fn send_message(
        &self,
        channel_id: Snowflake,
        body: impl Into<MessageBody>,
    ) -> GatewayResult<Message> {
        let (data, files) = body.into().into_body(&self.inner.components);
        let request = RestRequest::post(routes::channel_messages(channel_id))
            .json(data)
            .files(files);
        let response = self
            .inner
            .transport
            .execute(request)
            .await?
            .error_for_status()?;
        Ok(response.json()?)
    }

    /// Replace the bot's presence on the live connection
    pub async fn update_presence(&self, presence: &PresencePayload) -> GatewayResult<()> {
        if !presence.is_valid_status() {
            tracing::warn!(status = %presence.status, "Sending presence with unknown status");
        }
        let message = GatewayMessage::presence_update(presence)?;
        self.inner.state.send(message).await
    }

    /// Ask for the full member list of a guild; chunks are merged into the cache
    pub async fn request_guild_members(&self, guild_id: Snowflake) -> GatewayResult<()> {
        let message =
            GatewayMessage::request_guild_members(&RequestGuildMembersPayload::all(guild_id))?;
        self.inner.state.send(message).await
    }

    // === State ===

    /// Registry used to render views and modals into outgoing bodies
    pub fn components(&self) -> &ComponentRegistry {
        &self.inner.components
    }

    /// Cached guild, if GUILD_CREATE was seen for it
    pub fn guild(&self, id: Snowflake) -> Option<Guild> {
        self.inner.cache.get(id)
    }

    pub fn guild_ids(&self) -> Vec<Snowflake> {
        self.inner.cache.ids()
    }

    pub fn snapshot(&self) -> BotUser {
        self.inner.state.snapshot()
    }

    pub fn config(&self) -> &BotConfig {
        &self.inner.config
    }

    /// Connect and run the session until it ends
    pub async fn run(&self) -> GatewayResult<()> {
        let inner = &self.inner;
        let session = GatewaySession::new(
            inner.config.clone(),
            inner.transport.clone(),
            inner.state.clone(),
            inner.router.clone(),
            inner.dispatcher.clone(),
            inner.commands.clone(),
            inner.cache.clone(),
        );
        let result = session.run().await;
        inner.components.clear();
        result
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("phase", &self.inner.state.phase())
            .field("guilds", &self.inner.cache.len())
            .field("commands", &self.inner.commands.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::events::PartialApplication;
    use crate::rest::recording::RecordingTransport;
    use crate::rest::RestResponse;
    use botkit_core::User;
    use reqwest::Method;

    fn bot_with(recording: &Arc<RecordingTransport>) -> Bot {
        let transport: Arc<dyn Transport> = recording.clone();
        Bot::with_transport(BotConfig::new("token"), transport)
    }

    fn ready() -> ReadyEvent {
        ReadyEvent {
            v: 10,
            user: User {
                id: Snowflake::new(1),
                username: "bot".to_string(),
                ..User::default()
            },
            session_id: "s".to_string(),
            resume_gateway_url: None,
            application: PartialApplication {
                id: Snowflake::new(9),
                flags: 0,
            },
            guilds: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_send_message_posts_to_channel() {
        let recording = Arc::new(RecordingTransport::with_responder(|_| RestResponse {
            status: 200,
            body: r#"{"id":"100","channel_id":"42","content":"hello"}"#.to_string(),
        }));
        let bot = bot_with(&recording);

        let message = bot.send_message(Snowflake::new(42), "hello").await.unwrap();
        assert_eq!(message.id, Snowflake::new(100));

        let request = recording.last().unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/channels/42/messages");
        assert_eq!(request.body.unwrap()["content"], "hello");
    }

    #[tokio::test]
    async fn test_send_message_surfaces_status() {
        let recording = Arc::new(RecordingTransport::with_responder(|_| RestResponse {
            status: 403,
            body: r#"{"message":"Missing Access"}"#.to_string(),
        }));
        let bot = bot_with(&recording);

        let err = bot.send_message(Snowflake::new(42), "hi").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_add_commands_waits_for_bootstrap() {
        let recording = Arc::new(RecordingTransport::with_responder(|_| RestResponse {
            status: 201,
            body: r#"{"id":"55"}"#.to_string(),
        }));
        let bot = bot_with(&recording);

        let handles = bot.add_command(ApplicationCommand::slash("ping", "Ping"), |_ctx| async {
            Ok(())
        });
        assert!(handles.is_empty());
        assert_eq!(bot.inner.commands.pending_len(), 1);
        assert!(recording.requests().is_empty());

        bot.inner.state.apply_ready(&ready());
        // The first READY flush is the gateway's job; drain the queue here
        bot.inner.commands.flush(&bot.inner.transport, Snowflake::new(9));

        let handles = bot.add_command(ApplicationCommand::slash("late", "Late"), |_ctx| async {
            Ok(())
        });
        assert_eq!(handles.len(), 1);
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), Snowflake::new(55));
        }
        assert_eq!(bot.inner.commands.pending_len(), 0);
        assert!(recording
            .requests()
            .iter()
            .all(|r| r.path == "/applications/9/commands"));
    }

    #[tokio::test]
    async fn test_presence_without_connection() {
        let bot = bot_with(&Arc::new(RecordingTransport::new()));
        let presence = PresencePayload::from(&bot.config().presence);

        let err = bot.update_presence(&presence).await.unwrap_err();
        assert!(matches!(err, GatewayError::ChannelClosed));
        assert!(bot.request_guild_members(Snowflake::new(1)).await.is_err());
    }

    #[test]
    fn test_fresh_bot_state() {
        let bot = bot_with(&Arc::new(RecordingTransport::new()));
        let snapshot = bot.snapshot();
        assert!(!snapshot.bootstrapped);
        assert!(snapshot.user.is_none());
        assert!(bot.guild(Snowflake::new(1)).is_none());
        assert!(bot.guild_ids().is_empty());
        assert!(bot.components().callbacks().is_empty());
    }
}
