//! REST route builders

use botkit_core::Snowflake;

/// `GET` endpoint returning the websocket url
pub const GATEWAY: &str = "/gateway";

/// Create a command, globally or for one guild
pub fn application_commands(application_id: Snowflake, guild_id: Option<Snowflake>) -> String {
    match guild_id {
        Some(guild_id) => format!("/applications/{application_id}/guilds/{guild_id}/commands"),
        None => format!("/applications/{application_id}/commands"),
    }
}

/// Initial response to an interaction
pub fn interaction_callback(interaction_id: Snowflake, token: &str) -> String {
    format!("/interactions/{interaction_id}/{token}/callback")
}

/// Follow-up messages for an interaction
pub fn webhook(application_id: Snowflake, token: &str) -> String {
    format!("/webhooks/{application_id}/{token}")
}

/// The original interaction response
pub fn webhook_original(application_id: Snowflake, token: &str) -> String {
    format!("/webhooks/{application_id}/{token}/messages/@original")
}

pub fn channel_messages(channel_id: Snowflake) -> String {
    format!("/channels/{channel_id}/messages")
}
