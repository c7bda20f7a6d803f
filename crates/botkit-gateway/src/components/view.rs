//! Views: rows of components expanded into the wire component tree
//!
//! Expansion assigns a fresh custom id to every interactive element,
//! registers its callback and arms an expiry timer for it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use botkit_common::HandlerResult;
use botkit_core::ComponentType;
use serde_json::{json, Value};

use super::{Button, SelectMenu};
use crate::callbacks::{CallbackRegistry, ComponentRegistry, TimeoutHandler, ViewTimeout};
use crate::connection::BotUser;
use crate::interactions::ComponentContext;

/// Rows per message
pub const MAX_ROWS: usize = 5;

/// Buttons per row
pub const MAX_BUTTONS_PER_ROW: usize = 5;

/// Default and maximum view lifetime
pub const MAX_VIEW_TIMEOUT: Duration = Duration::from_secs(888);

/// One action row: up to five buttons or a single select menu
#[derive(Debug, Clone, Default)]
pub struct ActionRow {
    buttons: Vec<Button>,
    select: Option<SelectMenu>,
}

impl ActionRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    #[must_use]
    pub fn buttons(mut self, buttons: impl IntoIterator<Item = Button>) -> Self {
        self.buttons.extend(buttons);
        self
    }

    #[must_use]
    pub fn select(mut self, menu: SelectMenu) -> Self {
        self.select = Some(menu);
        self
    }

    fn is_empty(&self) -> bool {
        self.buttons.is_empty() && self.select.is_none()
    }
}

/// A set of rows with a shared lifetime
#[derive(Clone, Default)]
pub struct View {
    rows: Vec<ActionRow>,
    timeout: Option<Duration>,
    on_timeout: Option<TimeoutHandler>,
}

impl View {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn row(mut self, row: ActionRow) -> Self {
        self.rows.push(row);
        self
    }

    /// Lifetime of the view's callbacks; zero or anything above 888s means 888s
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run once when the view expires, with the last interaction context
    #[must_use]
    pub fn on_timeout<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(BotUser, Option<ComponentContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_timeout = Some(ViewTimeout::handler(f));
        self
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Timeout after defaulting and clamping
    pub fn effective_timeout(&self) -> Duration {
        match self.timeout {
            Some(timeout) if !timeout.is_zero() && timeout <= MAX_VIEW_TIMEOUT => timeout,
            _ => MAX_VIEW_TIMEOUT,
        }
    }

    /// Expand into the wire component tree, registering callbacks
    pub fn into_components(self, registry: &ComponentRegistry) -> Vec<Value> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        if self.rows.len() > MAX_ROWS {
            tracing::warn!(
                rows = self.rows.len(),
                "A view can hold at most 5 action rows, sending no components"
            );
            return Vec::new();
        }

        let expiry = self.effective_timeout();
        let view = self
            .on_timeout
            .clone()
            .map(|handler| Arc::new(ViewTimeout::new(expiry, Some(handler))));

        let mut components = Vec::with_capacity(self.rows.len());
        for row in self.rows {
            if row.is_empty() {
                continue;
            }
            let rendered = expand_row(row, registry, expiry, view.as_ref());
            if !rendered.is_empty() {
                components.push(json!({
                    "type": ComponentType::ActionRow.as_u8(),
                    "components": rendered,
                }));
            }
        }
        components
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("rows", &self.rows)
            .field("timeout", &self.timeout)
            .field("on_timeout", &self.on_timeout.is_some())
            .finish()
    }
}

fn expand_row(
    mut row: ActionRow,
    registry: &ComponentRegistry,
    expiry: Duration,
    view: Option<&Arc<ViewTimeout>>,
) -> Vec<Value> {
    let mut rendered = Vec::new();

    if row.buttons.len() > MAX_BUTTONS_PER_ROW {
        tracing::warn!(
            buttons = row.buttons.len(),
            "A row can hold at most 5 buttons, dropping the rest"
        );
        row.buttons.truncate(MAX_BUTTONS_PER_ROW);
    }

    let has_buttons = !row.buttons.is_empty();
    for mut button in row.buttons {
        if button.is_link() {
            rendered.push(button.render(None));
            continue;
        }
        let custom_id = match button.take_callback() {
            Some(callback) => registry.track(callback, expiry, view),
            None => CallbackRegistry::new_custom_id(),
        };
        rendered.push(button.render(Some(&custom_id)));
    }

    if let Some(mut menu) = row.select {
        if !menu.is_populated() {
            tracing::debug!("Skipping select menu without options");
        } else if has_buttons {
            tracing::warn!("Single ActionRow can contain either 1x SelectMenu or max 5x Buttons");
        } else {
            let custom_id = match menu.take_callback() {
                Some(callback) => registry.track(callback, expiry, view),
                None => CallbackRegistry::new_custom_id(),
            };
            rendered.push(menu.render(&custom_id));
        }
    }

    rendered
}
