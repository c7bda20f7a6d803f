//! Value objects - identifiers and flag sets shared by every payload

mod intents;
mod snowflake;

pub use intents::Intents;
pub use snowflake::{Snowflake, SnowflakeParseError};
