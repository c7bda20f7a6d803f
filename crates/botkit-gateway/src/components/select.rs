//! Select menus

use std::future::Future;

use botkit_common::HandlerResult;
use botkit_core::{ComponentType, PartialEmoji};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::callbacks::ComponentCallback;
use crate::interactions::ComponentContext;

/// Upper bound for `min_values`, `max_values` and option count
pub const MAX_SELECT_VALUES: i32 = 25;

/// Which entities the menu lets the user pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectKind {
    #[default]
    String,
    User,
    Role,
    Mentionable,
    Channel,
}

impl SelectKind {
    #[must_use]
    pub const fn component_type(self) -> ComponentType {
        match self {
            Self::String => ComponentType::StringSelect,
            Self::User => ComponentType::UserSelect,
            Self::Role => ComponentType::RoleSelect,
            Self::Mentionable => ComponentType::MentionableSelect,
            Self::Channel => ComponentType::ChannelSelect,
        }
    }
}

/// Option of a string select
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<PartialEmoji>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn emoji(mut self, emoji: PartialEmoji) -> Self {
        self.emoji = Some(emoji);
        self
    }

    #[must_use]
    pub fn selected(mut self) -> Self {
        self.default = true;
        self
    }
}

/// Select menu element
#[derive(Debug, Clone)]
pub struct SelectMenu {
    kind: SelectKind,
    placeholder: Option<String>,
    min_values: i32,
    max_values: i32,
    disabled: bool,
    options: Vec<SelectOption>,
    on_select: Option<ComponentCallback>,
}

impl Default for SelectMenu {
    fn default() -> Self {
        Self {
            kind: SelectKind::String,
            placeholder: None,
            min_values: 1,
            max_values: 1,
            disabled: false,
            options: Vec::new(),
            on_select: None,
        }
    }
}

impl SelectMenu {
    #[must_use]
    pub fn new(kind: SelectKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Values outside `0..=25` are logged and left off the wire
    #[must_use]
    pub fn min_values(mut self, min: i32) -> Self {
        self.min_values = min;
        self
    }

    /// Values outside `1..=25` are logged and left off the wire
    #[must_use]
    pub fn max_values(mut self, max: i32) -> Self {
        self.max_values = max;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    #[must_use]
    pub fn option(mut self, option: SelectOption) -> Self {
        self.options.push(option);
        self
    }

    #[must_use]
    pub fn options(mut self, options: impl IntoIterator<Item = SelectOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// Callback run with the selected values on every selection
    #[must_use]
    pub fn on_select<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ComponentContext, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_select = Some(ComponentCallback::selection(f));
        self
    }

    pub fn kind(&self) -> SelectKind {
        self.kind
    }

    /// String selects need options; entity selects are populated by the client
    pub fn is_populated(&self) -> bool {
        self.kind != SelectKind::String || !self.options.is_empty()
    }

    pub(crate) fn take_callback(&mut self) -> Option<ComponentCallback> {
        self.on_select.take()
    }

    pub(crate) fn render(&self, custom_id: &str) -> Value {
        let mut menu = Map::new();
        menu.insert("type".into(), json!(self.kind.component_type().as_u8()));
        menu.insert("custom_id".into(), json!(custom_id));

        if let Some(placeholder) = &self.placeholder {
            menu.insert("placeholder".into(), json!(placeholder));
        }

        if (0..=MAX_SELECT_VALUES).contains(&self.min_values) {
            menu.insert("min_values".into(), json!(self.min_values));
        } else {
            tracing::warn!(
                min_values = self.min_values,
                "min_values must be between 0 and 25, omitting"
            );
        }

        if (1..=MAX_SELECT_VALUES).contains(&self.max_values) {
            menu.insert("max_values".into(), json!(self.max_values));
        } else {
            tracing::warn!(
                max_values = self.max_values,
                "max_values must be between 1 and 25, omitting"
            );
        }

        if self.disabled {
            menu.insert("disabled".into(), json!(true));
        }
        if !self.options.is_empty() {
            menu.insert("options".into(), json!(self.options));
        }
        Value::Object(menu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colours() -> SelectMenu {
        SelectMenu::new(SelectKind::String)
            .placeholder("Pick a colour")
            .option(SelectOption::new("Red", "red").selected())
            .option(SelectOption::new("Blue", "blue").description("Calm"))
    }

    #[test]
    fn test_render_defaults() {
        let value = colours().render("menu");
        assert_eq!(value["type"], 3);
        assert_eq!(value["custom_id"], "menu");
        assert_eq!(value["min_values"], 1);
        assert_eq!(value["max_values"], 1);
        assert_eq!(value["options"][0]["default"], true);
        assert!(value["options"][1].get("default").is_none());
        assert_eq!(value["options"][1]["description"], "Calm");
    }

    #[test]
    fn test_out_of_range_bounds_are_omitted() {
        let value = colours().max_values(30).render("menu");
        assert!(value.get("max_values").is_none());
        assert_eq!(value["min_values"], 1);

        let value = colours().min_values(-1).render("menu");
        assert!(value.get("min_values").is_none());
        assert_eq!(value["max_values"], 1);

        let value = colours().min_values(0).max_values(25).render("menu");
        assert_eq!(value["min_values"], 0);
        assert_eq!(value["max_values"], 25);
    }

    #[test]
    fn test_populated() {
        assert!(colours().is_populated());
        assert!(!SelectMenu::new(SelectKind::String).is_populated());
        assert!(SelectMenu::new(SelectKind::User).is_populated());
        assert_eq!(SelectMenu::new(SelectKind::Channel).render("c")["type"], 8);
    }
}
