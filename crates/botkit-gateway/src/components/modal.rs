//! Modals: pop-up forms answered with a one-shot submit

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use botkit_common::HandlerResult;
use botkit_core::ComponentType;
use serde_json::{json, Map, Value};

use super::view::MAX_VIEW_TIMEOUT;
use crate::callbacks::{CallbackRegistry, ComponentCallback, ComponentRegistry};
use crate::interactions::{ComponentContext, ResponseType};

/// Inputs per modal
pub const MAX_INPUTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextInputStyle {
    #[default]
    Short,
    Paragraph,
}

impl TextInputStyle {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Short => 1,
            Self::Paragraph => 2,
        }
    }
}

/// Text field; its `custom_id` keys the submitted value
#[derive(Debug, Clone)]
pub struct TextInput {
    custom_id: String,
    label: String,
    style: TextInputStyle,
    placeholder: Option<String>,
    value: Option<String>,
    required: bool,
    min_length: Option<u16>,
    max_length: Option<u16>,
}

impl TextInput {
    pub fn new(style: TextInputStyle, custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: label.into(),
            style,
            placeholder: None,
            value: None,
            required: true,
            min_length: None,
            max_length: None,
        }
    }

    pub fn short(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(TextInputStyle::Short, custom_id, label)
    }

    pub fn paragraph(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(TextInputStyle::Paragraph, custom_id, label)
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Pre-filled value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn length(mut self, min: u16, max: u16) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    fn render(&self) -> Value {
        let mut input = Map::new();
        input.insert("type".into(), json!(ComponentType::TextInput.as_u8()));
        input.insert("custom_id".into(), json!(self.custom_id));
        input.insert("label".into(), json!(self.label));
        input.insert("style".into(), json!(self.style.as_u8()));
        input.insert("required".into(), json!(self.required));
        if let Some(placeholder) = &self.placeholder {
            input.insert("placeholder".into(), json!(placeholder));
        }
        if let Some(value) = &self.value {
            input.insert("value".into(), json!(value));
        }
        if let Some(min) = self.min_length {
            input.insert("min_length".into(), json!(min));
        }
        if let Some(max) = self.max_length {
            input.insert("max_length".into(), json!(max));
        }
        Value::Object(input)
    }
}

/// Modal form
#[derive(Debug, Clone)]
pub struct Modal {
    title: String,
    inputs: Vec<TextInput>,
    on_submit: Option<ComponentCallback>,
    timeout: Option<Duration>,
}

impl Modal {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            inputs: Vec::new(),
            on_submit: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn input(mut self, input: TextInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// One-shot callback receiving input values keyed by input id
    #[must_use]
    pub fn on_submit<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ComponentContext, HashMap<String, String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_submit = Some(ComponentCallback::submit(f));
        self
    }

    /// How long the submit callback stays registered, capped like views
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn effective_timeout(&self) -> Duration {
        match self.timeout {
            Some(timeout) if !timeout.is_zero() && timeout <= MAX_VIEW_TIMEOUT => timeout,
            _ => MAX_VIEW_TIMEOUT,
        }
    }

    /// Interaction response body, registering the submit callback
    pub fn into_response(mut self, registry: &ComponentRegistry) -> Value {
        if self.inputs.len() > MAX_INPUTS {
            tracing::warn!(
                inputs = self.inputs.len(),
                "A modal can hold at most 5 inputs, dropping the rest"
            );
            self.inputs.truncate(MAX_INPUTS);
        }

        let expiry = self.effective_timeout();
        let custom_id = match self.on_submit.take() {
            Some(callback) => registry.track(callback, expiry, None),
            None => CallbackRegistry::new_custom_id(),
        };

        let rows: Vec<Value> = self
            .inputs
            .iter()
            .map(|input| {
                json!({
                    "type": ComponentType::ActionRow.as_u8(),
                    "components": [input.render()],
                })
            })
            .collect();

        json!({
            "type": ResponseType::Modal.as_u8(),
            "data": {
                "custom_id": custom_id,
                "title": self.title,
                "components": rows,
            }
        })
    }
}
