use poise::serenity_prelude as serenity;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is not a valid {expected}: {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Community-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub guild_id: serenity::GuildId,
    pub community_name: String,

    pub staff_role_id: serenity::RoleId,
    pub mod_role_id: Option<serenity::RoleId>,
    pub admin_role_id: Option<serenity::RoleId>,
    pub under_review_role_id: serenity::RoleId,
    pub staff_log_channel_id: serenity::ChannelId,

    pub protected_user_id: Option<serenity::UserId>,

    pub ticket_open_category_id: serenity::ChannelId,
    pub ticket_locked_category_id: serenity::ChannelId,
    pub ticket_intake_channel_id: Option<serenity::ChannelId>,
    pub welcome_channel_id: Option<serenity::ChannelId>,

    pub ai: AiConfig,

    pub http_port: u16,
    pub giveaway_sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests do not have to touch the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Lookup(&lookup);

        Ok(Self {
            guild_id: serenity::GuildId::new(env.id("GUILD_ID")?),
            community_name: env
                .optional("COMMUNITY_NAME")
                .unwrap_or_else(|| "Dutz Dungeon".to_string()),
            staff_role_id: serenity::RoleId::new(env.id("STAFF_ROLE_ID")?),
            mod_role_id: env.optional_id("MOD_ROLE_ID")?.map(serenity::RoleId::new),
            admin_role_id: env.optional_id("ADMIN_ROLE_ID")?.map(serenity::RoleId::new),
            under_review_role_id: serenity::RoleId::new(env.id("WEEK_BAN_ROLE_ID")?),
            staff_log_channel_id: serenity::ChannelId::new(env.id("STAFF_LOG_CHANNEL_ID")?),
            protected_user_id: env
                .optional_id("PING_FORBIDDEN_USER_ID")?
                .map(serenity::UserId::new),
            ticket_open_category_id: serenity::ChannelId::new(
                env.id("TICKET_OPEN_CATEGORY_ID")?,
            ),
            ticket_locked_category_id: serenity::ChannelId::new(
                env.id("TICKET_LOCKED_CATEGORY_ID")?,
            ),
            ticket_intake_channel_id: env
                .optional_id("TICKET_INTAKE_CHANNEL_ID")?
                .map(serenity::ChannelId::new),
            welcome_channel_id: env
                .optional_id("WELCOME_CHANNEL_ID")?
                .map(serenity::ChannelId::new),
            ai: AiConfig {
                base_url: env
                    .optional("OPENROUTER_BASE_URL")
                    .unwrap_or_else(|| "https://openrouter.ai/api/v1".to_string()),
                api_key: env.required("OPENROUTER_API_KEY")?,
                model: env.required("OPENROUTER_MODEL")?,
                timeout: Duration::from_secs(env.number("AI_TIMEOUT_SECS", 20)?),
            },
            http_port: env.number("PORT", 3000)?,
            giveaway_sweep_interval: Duration::from_secs(env.number("GIVEAWAY_SWEEP_SECS", 15)?),
        })
    }

    /// Roles allowed to run gated commands.
    pub fn staff_roles(&self) -> impl Iterator<Item = serenity::RoleId> + '_ {
        std::iter::once(self.staff_role_id)
            .chain(self.mod_role_id)
            .chain(self.admin_role_id)
    }

    pub fn is_staff(&self, roles: &[serenity::RoleId]) -> bool {
        self.staff_roles().any(|staff| roles.contains(&staff))
    }
}

struct Lookup<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Lookup<'_, F> {
    fn optional(&self, key: &'static str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn id(&self, key: &'static str) -> Result<u64, ConfigError> {
        parse_id(key, &self.required(key)?)
    }

    fn optional_id(&self, key: &'static str) -> Result<Option<u64>, ConfigError> {
        self.optional(key).map(|v| parse_id(key, &v)).transpose()
    }

    fn number<T: std::str::FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                key,
                expected: "number",
                value,
            }),
            None => Ok(default),
        }
    }
}

// Snowflakes are non-zero; serenity's id constructors panic on 0.
fn parse_id(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(ConfigError::Invalid {
            key,
            expected: "snowflake id",
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GUILD_ID", "100"),
            ("STAFF_ROLE_ID", "200"),
            ("WEEK_BAN_ROLE_ID", "201"),
            ("STAFF_LOG_CHANNEL_ID", "300"),
            ("TICKET_OPEN_CATEGORY_ID", "400"),
            ("TICKET_LOCKED_CATEGORY_ID", "401"),
            ("OPENROUTER_API_KEY", "key"),
            ("OPENROUTER_MODEL", "some/model"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<BotConfig, ConfigError> {
        BotConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply_when_optional_keys_are_absent() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.giveaway_sweep_interval, Duration::from_secs(15));
        assert_eq!(config.ai.timeout, Duration::from_secs(20));
        assert_eq!(config.community_name, "Dutz Dungeon");
        assert!(config.protected_user_id.is_none());
        assert!(config.ticket_intake_channel_id.is_none());
    }

    #[test]
    fn missing_required_key_is_reported_by_name() {
        let mut env = base_env();
        env.remove("STAFF_LOG_CHANNEL_ID");
        let err = load(&env).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("STAFF_LOG_CHANNEL_ID")));
    }

    #[test]
    fn zero_or_garbage_ids_are_rejected() {
        let mut env = base_env();
        env.insert("GUILD_ID", "0");
        assert!(matches!(load(&env), Err(ConfigError::Invalid { key: "GUILD_ID", .. })));

        let mut env = base_env();
        env.insert("MOD_ROLE_ID", "not-a-number");
        assert!(matches!(load(&env), Err(ConfigError::Invalid { key: "MOD_ROLE_ID", .. })));
    }

    #[test]
    fn any_of_the_staff_roles_counts_as_staff() {
        let mut env = base_env();
        env.insert("MOD_ROLE_ID", "202");
        let config = load(&env).unwrap();

        assert!(config.is_staff(&[serenity::RoleId::new(200)]));
        assert!(config.is_staff(&[serenity::RoleId::new(999), serenity::RoleId::new(202)]));
        assert!(!config.is_staff(&[serenity::RoleId::new(201)]));
        assert!(!config.is_staff(&[]));
    }
}
