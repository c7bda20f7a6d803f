//! Interaction contexts and the dispatcher that builds them

mod context;
mod dispatcher;

#[cfg(test)]
pub(crate) use context::test_component_context;
pub use context::{
    AutocompleteContext, CommandContext, ComponentContext, InteractionContext, ResponseType,
    MAX_AUTOCOMPLETE_CHOICES,
};
pub use dispatcher::{AutocompleteHandler, InteractionDispatcher, InteractionHandler};
