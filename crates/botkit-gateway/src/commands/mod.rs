//! Application command registration and lookup

mod registry;

pub use registry::{CommandHandler, CommandRegistry, PendingCommand};
