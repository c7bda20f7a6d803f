//! Command registry
//!
//! Commands are queued until the first READY supplies the application id,
//! then registered concurrently. Only commands the platform accepted are
//! routable, keyed by the id it returned.

use std::future::Future;
use std::sync::Arc;

use botkit_common::HandlerResult;
use botkit_core::{ApplicationCommand, Snowflake};
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::error::{GatewayError, GatewayResult};
use crate::interactions::CommandContext;
use crate::rest::{routes, RestRequest, Transport};

/// Erased command handler
pub type CommandHandler =
    Arc<dyn Fn(CommandContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A command definition waiting for registration
#[derive(Clone)]
pub struct PendingCommand {
    pub definition: ApplicationCommand,
    pub handler: CommandHandler,
}

impl PendingCommand {
    pub fn new<F, Fut>(definition: ApplicationCommand, f: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            definition,
            handler: Arc::new(move |ctx: CommandContext| f(ctx).boxed()),
        }
    }
}

impl std::fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCommand")
            .field("name", &self.definition.name)
            .field("guild_id", &self.definition.guild_id)
            .finish_non_exhaustive()
    }
}

/// Body returned by the create-command endpoint; only the id matters
#[derive(Debug, Deserialize)]
struct CreatedCommand {
    id: Snowflake,
}

/// Pending queue plus the post-registration routing table
#[derive(Default)]
pub struct CommandRegistry {
    pending: Mutex<Vec<PendingCommand>>,
    registered: Arc<DashMap<Snowflake, CommandHandler>>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue commands for the next flush
    pub fn enqueue(&self, commands: impl IntoIterator<Item = PendingCommand>) {
        self.pending.lock().extend(commands);
    }

    /// Handler for a registered command id
    pub fn handler(&self, command_id: Snowflake) -> Option<CommandHandler> {
        self.registered.get(&command_id).map(|h| h.value().clone())
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drain the queue, registering each command on its own task
    pub fn flush(
        &self,
        transport: &Arc<dyn Transport>,
        application_id: Snowflake,
    ) -> Vec<JoinHandle<GatewayResult<Snowflake>>> {
        let pending = std::mem::take(&mut *self.pending.lock());
        if !pending.is_empty() {
            tracing::info!(
                count = pending.len(),
                application_id = %application_id,
                "Registering application commands"
            );
        }

        pending
            .into_iter()
            .map(|command| {
                let transport = Arc::clone(transport);
                let registered = Arc::clone(&self.registered);
                tokio::spawn(async move {
                    let name = command.definition.name.clone();
                    let result =
                        register(transport.as_ref(), application_id, &command.definition).await;
                    match result {
                        Ok(id) => {
                            registered.insert(id, command.handler);
                            tracing::info!(
                                command = %name,
                                command_id = %id,
                                "Registered command"
                            );
                            Ok(id)
                        }
                        Err(error) => {
                            tracing::error!(
                                command = %name,
                                error = %error,
                                "Failed to register command"
                            );
                            Err(error)
                        }
                    }
                })
            })
            .collect()
    }
}

async fn register(
    transport: &dyn Transport,
    application_id: Snowflake,
    command: &ApplicationCommand,
) -> GatewayResult<Snowflake> {
    let path = routes::application_commands(application_id, command.guild_id);
    let request = RestRequest::post(path).json(serde_json::to_value(command)?);
    let response = transport.execute(request).await?;

    if !response.is_success() {
        return Err(GatewayError::Registration {
            command: command.name.clone(),
            status: response.status,
            message: response.error_message(),
        });
    }
    let created: CreatedCommand = response.json()?;
    Ok(created.id)
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("pending", &self.pending_len())
            .field("registered", &self.len())
            .finish()
    }
}
