//! # botkit-common
//!
//! Shared utilities including configuration, handler error types, and telemetry.

pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{BotConfig, ConfigError, PresenceConfig, ReconnectConfig};
pub use error::{error_chain, HandlerResult};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TelemetryConfig, TelemetryError,
};
