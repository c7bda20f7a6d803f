//! Callback registry
//!
//! Maps component custom ids to the callbacks registered when a view or
//! modal was rendered. `consume` is the single atomic removal point shared by
//! the submit path and the expiry path.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use botkit_common::HandlerResult;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use uuid::Uuid;

use crate::interactions::ComponentContext;

/// Button click callback
pub type ClickHandler =
    Arc<dyn Fn(ComponentContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Select menu callback receiving the chosen values
pub type SelectHandler =
    Arc<dyn Fn(ComponentContext, Vec<String>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Modal submit callback receiving input values keyed by input custom id
pub type SubmitHandler = Arc<
    dyn Fn(ComponentContext, HashMap<String, String>) -> BoxFuture<'static, HandlerResult>
        + Send
        + Sync,
>;

/// Callback attached to one interactive element
#[derive(Clone)]
pub enum ComponentCallback {
    /// Multi-use, invoked with no arguments
    Click(ClickHandler),
    /// Multi-use, invoked with the selected values
    Selection(SelectHandler),
    /// One-shot, consumed on submit
    Submit(SubmitHandler),
}

impl ComponentCallback {
    pub fn click<F, Fut>(f: F) -> Self
    where
        F: Fn(ComponentContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::Click(Arc::new(move |ctx: ComponentContext| f(ctx).boxed()))
    }

    pub fn selection<F, Fut>(f: F) -> Self
    where
        F: Fn(ComponentContext, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::Selection(Arc::new(move |ctx: ComponentContext, values: Vec<String>| {
            f(ctx, values).boxed()
        }))
    }

    pub fn submit<F, Fut>(f: F) -> Self
    where
        F: Fn(ComponentContext, HashMap<String, String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::Submit(Arc::new(
            move |ctx: ComponentContext, values: HashMap<String, String>| f(ctx, values).boxed(),
        ))
    }

    /// Whether invoking this callback removes it
    pub const fn is_one_shot(&self) -> bool {
        matches!(self, Self::Submit(_))
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click(_) => "click",
            Self::Selection(_) => "selection",
            Self::Submit(_) => "submit",
        }
    }

    /// Build the invocation future for an incoming interaction
    pub fn invoke(&self, ctx: ComponentContext) -> BoxFuture<'static, HandlerResult> {
        match self {
            Self::Click(handler) => handler(ctx),
            Self::Selection(handler) => {
                let values = ctx.values.clone();
                handler(ctx, values)
            }
            Self::Submit(handler) => {
                let values = ctx.modal_values.clone();
                handler(ctx, values)
            }
        }
    }
}

impl std::fmt::Debug for ComponentCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentCallback::{}", self.name())
    }
}

/// Live component callbacks keyed by custom id
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    entries: DashMap<String, ComponentCallback>,
}

impl CallbackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh custom id (UUID v4, simple form)
    pub fn new_custom_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Insert or replace the callback for `custom_id`
    pub fn register(&self, custom_id: impl Into<String>, callback: ComponentCallback) {
        self.entries.insert(custom_id.into(), callback);
    }

    /// Register under a freshly allocated id that is not currently live
    pub fn register_new(&self, callback: ComponentCallback) -> String {
        loop {
            let custom_id = Self::new_custom_id();
            if let Entry::Vacant(slot) = self.entries.entry(custom_id.clone()) {
                slot.insert(callback);
                return custom_id;
            }
        }
    }

    /// Atomically look up and remove
    pub fn consume(&self, custom_id: &str) -> Option<ComponentCallback> {
        self.entries.remove(custom_id).map(|(_, callback)| callback)
    }

    /// Look up without removing
    pub fn peek(&self, custom_id: &str) -> Option<ComponentCallback> {
        self.entries.get(custom_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, custom_id: &str) -> bool {
        self.entries.contains_key(custom_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
