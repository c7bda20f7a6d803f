//! Component callbacks and their expiry

mod registry;
mod timeout;

pub use registry::{
    CallbackRegistry, ClickHandler, ComponentCallback, SelectHandler, SubmitHandler,
};
pub use timeout::{TimeoutHandler, TimeoutScheduler, ViewTimeout};

use std::sync::Arc;
use std::time::Duration;

use crate::connection::SessionState;

/// Callback registry plus its timeout scheduler, shared by rendering and
/// dispatch
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    callbacks: Arc<CallbackRegistry>,
    timeouts: Arc<TimeoutScheduler>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new(state: Arc<SessionState>) -> Self {
        let callbacks = Arc::new(CallbackRegistry::new());
        let timeouts = Arc::new(TimeoutScheduler::new(callbacks.clone(), state));
        Self {
            callbacks,
            timeouts,
        }
    }

    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    pub fn timeouts(&self) -> &Arc<TimeoutScheduler> {
        &self.timeouts
    }

    /// Register a callback under a fresh custom id and arm its expiry timer
    pub fn track(
        &self,
        callback: ComponentCallback,
        expiry: Duration,
        view: Option<&Arc<ViewTimeout>>,
    ) -> String {
        let custom_id = self.callbacks.register_new(callback);
        if let Some(view) = view {
            self.timeouts.register(custom_id.clone(), Arc::clone(view));
        }
        self.timeouts.schedule(custom_id.clone(), expiry);
        custom_id
    }

    /// Drop every callback and timer
    pub fn clear(&self) {
        self.timeouts.clear();
        self.callbacks.clear();
    }
}
