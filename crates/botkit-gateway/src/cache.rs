//! Guild cache filled from GUILD_CREATE and member chunks

use botkit_core::{Guild, Member, Snowflake};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct GuildCache {
    guilds: DashMap<Snowflake, Guild>,
}

impl GuildCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a guild
    pub fn insert(&self, guild: Guild) {
        self.guilds.insert(guild.id, guild);
    }

    pub fn remove(&self, id: Snowflake) -> Option<Guild> {
        self.guilds.remove(&id).map(|(_, guild)| guild)
    }

    pub fn get(&self, id: Snowflake) -> Option<Guild> {
        self.guilds.get(&id).map(|g| g.value().clone())
    }

    /// Merge a member chunk; false when the guild is not cached
    pub fn merge_members(&self, guild_id: Snowflake, members: Vec<Member>) -> bool {
        match self.guilds.get_mut(&guild_id) {
            Some(mut guild) => {
                guild.merge_members(members);
                true
            }
            None => false,
        }
    }

    pub fn ids(&self) -> Vec<Snowflake> {
        self.guilds.iter().map(|g| *g.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.guilds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guilds.is_empty()
    }
}
