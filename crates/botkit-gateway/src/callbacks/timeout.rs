//! Expiry timers for component callbacks
//!
//! Every interactive element rendered with a callback gets a cancellable
//! timer keyed by its custom id. Elements of a view that declares an
//! on-timeout handler share one `ViewTimeout`, so the handler fires at most
//! once per view.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use botkit_common::HandlerResult;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use super::CallbackRegistry;
use crate::connection::{BotUser, SessionState};
use crate::interactions::ComponentContext;
use crate::task::{spawn_handler, HandlerKind};

/// View timeout callback; receives the context of the last interaction with
/// the view, if there was one
pub type TimeoutHandler = Arc<
    dyn Fn(BotUser, Option<ComponentContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync,
>;

/// Timeout state shared by every element of one view
pub struct ViewTimeout {
    duration: Duration,
    handler: Option<TimeoutHandler>,
    last_ctx: Mutex<Option<ComponentContext>>,
    fired: AtomicBool,
}

impl ViewTimeout {
    #[must_use]
    pub fn new(duration: Duration, handler: Option<TimeoutHandler>) -> Self {
        Self {
            duration,
            handler,
            last_ctx: Mutex::new(None),
            fired: AtomicBool::new(false),
        }
    }

    /// Wrap an async closure as a `TimeoutHandler`
    pub fn handler<F, Fut>(f: F) -> TimeoutHandler
    where
        F: Fn(BotUser, Option<ComponentContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Arc::new(move |bot: BotUser, ctx: Option<ComponentContext>| f(bot, ctx).boxed())
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Remember the most recent interaction with the view
    pub fn record(&self, ctx: ComponentContext) {
        *self.last_ctx.lock() = Some(ctx);
    }

    pub fn last_context(&self) -> Option<ComponentContext> {
        self.last_ctx.lock().clone()
    }

    /// Claim the single firing; true for exactly one caller
    fn claim(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ViewTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewTimeout")
            .field("duration", &self.duration)
            .field("has_handler", &self.handler.is_some())
            .field("fired", &self.has_fired())
            .finish_non_exhaustive()
    }
}

/// Cancellable per-custom-id expiry timers
pub struct TimeoutScheduler {
    callbacks: Arc<CallbackRegistry>,
    entries: DashMap<String, Arc<ViewTimeout>>,
    timers: DashMap<String, AbortHandle>,
    state: Arc<SessionState>,
}

impl TimeoutScheduler {
    #[must_use]
    pub fn new(callbacks: Arc<CallbackRegistry>, state: Arc<SessionState>) -> Self {
        Self {
            callbacks,
            entries: DashMap::new(),
            timers: DashMap::new(),
            state,
        }
    }

    /// Attach a view timeout to a custom id
    pub fn register(&self, custom_id: impl Into<String>, timeout: Arc<ViewTimeout>) {
        self.entries.insert(custom_id.into(), timeout);
    }

    pub fn entry(&self, custom_id: &str) -> Option<Arc<ViewTimeout>> {
        self.entries.get(custom_id).map(|e| e.value().clone())
    }

    /// Arm the expiry timer for `custom_id`, replacing any running one
    pub fn schedule(self: &Arc<Self>, custom_id: impl Into<String>, duration: Duration) {
        let custom_id = custom_id.into();
        let scheduler = Arc::clone(self);
        let id = custom_id.clone();

        let (armed_tx, armed_rx) = oneshot::channel::<()>();

        // The sleep starts only once the handle is stored
        let task = tokio::spawn(async move {
            if armed_rx.await.is_err() {
                return;
            }
            tokio::time::sleep(duration).await;
            scheduler.expire(&id);
        });

        if let Some(previous) = self.timers.insert(custom_id, task.abort_handle()) {
            previous.abort();
        }
        let _ = armed_tx.send(());
    }

    /// Expire `custom_id` now. Returns true when the callback was still live.
    pub fn expire(&self, custom_id: &str) -> bool {
        self.timers.remove(custom_id);
        let view = self.entries.remove(custom_id).map(|(_, view)| view);

        if self.callbacks.consume(custom_id).is_none() {
            return false;
        }
        tracing::debug!(custom_id = %custom_id, "Component callback expired");

        if let Some(view) = view {
            if let Some(handler) = view.handler.clone() {
                if view.claim() {
                    let bot = self.state.snapshot();
                    let ctx = view.last_context();
                    spawn_handler(HandlerKind::Timeout, custom_id, async move {
                        handler(bot, ctx).await
                    });
                }
            }
        }
        true
    }

    /// Store the context of an interaction on the view it belongs to
    pub fn record_context(&self, custom_id: &str, ctx: ComponentContext) -> bool {
        match self.entries.get(custom_id) {
            Some(view) => {
                view.record(ctx);
                true
            }
            None => false,
        }
    }

    /// Stop the timer and forget the timeout entry without firing
    pub fn cancel(&self, custom_id: &str) -> bool {
        let timer = self.timers.remove(custom_id);
        if let Some((_, handle)) = &timer {
            handle.abort();
        }
        let entry = self.entries.remove(custom_id);
        timer.is_some() || entry.is_some()
    }

    /// Number of armed timers
    pub fn pending_len(&self) -> usize {
        self.timers.len()
    }

    /// Abort every timer and drop every entry
    pub fn clear(&self) {
        for timer in self.timers.iter() {
            timer.value().abort();
        }
        self.timers.clear();
        self.entries.clear();
    }
}

impl std::fmt::Debug for TimeoutScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutScheduler")
            .field("entries", &self.entries.len())
            .field("timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}
