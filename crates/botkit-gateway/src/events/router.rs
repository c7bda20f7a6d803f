//! Event router
//!
//! Maps dispatch event names to user handlers. Each dispatch runs on its own
//! task, so a slow or failing handler never blocks the read loop.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use botkit_common::HandlerResult;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::connection::BotUser;
use crate::protocol::GatewayMessage;
use crate::task::{spawn_handler, HandlerKind};

/// Type-erased event handler taking the raw `d` payload
pub type EventHandler =
    Arc<dyn Fn(BotUser, Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Observer invoked with every decoded frame
pub type RawObserver =
    Arc<dyn Fn(BotUser, GatewayMessage) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Routes dispatch events to at most one handler per event name
#[derive(Default)]
pub struct EventRouter {
    handlers: DashMap<String, EventHandler>,
    raw: RwLock<Option<RawObserver>>,
}

impl EventRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event name, replacing any previous one
    pub fn add_handler(&self, event: impl Into<String>, handler: EventHandler) {
        let event = event.into();
        if self.handlers.insert(event.clone(), handler).is_some() {
            tracing::debug!(event = %event, "Replaced event handler");
        }
    }

    /// Register a typed handler; the payload is decoded inside the handler task
    pub fn on<E, F, Fut>(&self, event: impl Into<String>, f: F)
    where
        E: DeserializeOwned + Send + 'static,
        F: Fn(BotUser, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let event = event.into();
        let name = event.clone();
        let f = Arc::new(f);
        let handler: EventHandler = Arc::new(move |bot: BotUser, payload: Value| {
            let f = f.clone();
            let name = name.clone();
            async move {
                let decoded: E = serde_json::from_value(payload)
                    .with_context(|| format!("decoding {name} payload"))?;
                f(bot, decoded).await
            }
            .boxed()
        });
        self.add_handler(event, handler);
    }

    pub fn has_handler(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Spawn the handler for `event`, if any. Returns the task handle.
    pub fn dispatch(&self, event: &str, payload: Value, bot: BotUser) -> Option<JoinHandle<()>> {
        // Clone out of the map so no shard lock is held across the spawn
        let handler = self.handlers.get(event).map(|h| h.value().clone())?;
        tracing::trace!(event = %event, "Dispatching event");
        Some(spawn_handler(HandlerKind::Event, event, async move {
            handler(bot, payload).await
        }))
    }

    /// Install the raw frame observer
    pub fn set_raw_observer<F, Fut>(&self, f: F)
    where
        F: Fn(BotUser, GatewayMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let observer: RawObserver =
            Arc::new(move |bot: BotUser, message: GatewayMessage| f(bot, message).boxed());
        *self.raw.write() = Some(observer);
    }

    /// Hand a frame to the raw observer, if one is installed
    pub fn observe_raw(&self, message: &GatewayMessage, bot: BotUser) -> Option<JoinHandle<()>> {
        let observer = self.raw.read().clone()?;
        let message = message.clone();
        Some(spawn_handler(HandlerKind::Raw, "socket_receive", async move {
            observer(bot, message).await
        }))
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("handlers", &self.handlers.len())
            .field("raw_observer", &self.raw.read().is_some())
            .finish()
    }
}
