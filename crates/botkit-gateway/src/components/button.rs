//! Buttons

use std::future::Future;

use botkit_common::HandlerResult;
use botkit_core::{ComponentType, PartialEmoji};
use serde_json::{json, Map, Value};

use crate::callbacks::ComponentCallback;
use crate::interactions::ComponentContext;

/// Button colour; `Link` buttons open a url and never reach the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ButtonStyle {
    #[default]
    Primary,
    Secondary,
    Success,
    Danger,
    Link,
}

impl ButtonStyle {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Success => 3,
            Self::Danger => 4,
            Self::Link => 5,
        }
    }
}

/// Button element
#[derive(Debug, Clone, Default)]
pub struct Button {
    style: ButtonStyle,
    label: Option<String>,
    emoji: Option<PartialEmoji>,
    url: Option<String>,
    disabled: bool,
    on_click: Option<ComponentCallback>,
}

impl Button {
    #[must_use]
    pub fn new(style: ButtonStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    /// Link button opening `url`
    #[must_use]
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            style: ButtonStyle::Link,
            url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn emoji(mut self, emoji: PartialEmoji) -> Self {
        self.emoji = Some(emoji);
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Callback run on every click until the view expires
    #[must_use]
    pub fn on_click<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ComponentContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_click = Some(ComponentCallback::click(f));
        self
    }

    pub fn style(&self) -> ButtonStyle {
        self.style
    }

    pub fn is_link(&self) -> bool {
        self.style == ButtonStyle::Link
    }

    pub(crate) fn take_callback(&mut self) -> Option<ComponentCallback> {
        if self.is_link() {
            return None;
        }
        self.on_click.take()
    }

    /// Wire shape; link buttons ignore `custom_id`
    pub(crate) fn render(&self, custom_id: Option<&str>) -> Value {
        let mut button = Map::new();
        button.insert("type".into(), json!(ComponentType::Button.as_u8()));
        button.insert("style".into(), json!(self.style.as_u8()));
        button.insert(
            "label".into(),
            json!(self.label.as_deref().unwrap_or("Button")),
        );

        if self.is_link() {
            if let Some(url) = &self.url {
                button.insert("url".into(), json!(url));
            }
        } else if let Some(custom_id) = custom_id {
            button.insert("custom_id".into(), json!(custom_id));
        }

        if let Some(emoji) = &self.emoji {
            button.insert("emoji".into(), json!(emoji));
        }
        if self.disabled {
            button.insert("disabled".into(), json!(true));
        }
        Value::Object(button)
    }
}
