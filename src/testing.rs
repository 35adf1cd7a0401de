//! Shared doubles for unit tests: an in-memory database with the real migrations, a
//! gateway that records every call, and a scripted AI responder.

use crate::config::BotConfig;
use crate::db::migrations::Migrator;
use crate::services::ai::Responder;
use crate::services::gateway::{ControlButton, Gateway, NotFound, Reactor};
use crate::services::localization::{L10nProxy, LocalizationManager};
use crate::Error;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub async fn database() -> DatabaseConnection {
    // One connection, otherwise every pooled connection gets its own empty memory db
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await.expect("in-memory sqlite");
    Migrator::up(&db, None).await.expect("migrations apply");
    db
}

pub fn config() -> Arc<BotConfig> {
    let env = HashMap::from([
        ("GUILD_ID", "1000"),
        ("STAFF_ROLE_ID", "2000"),
        ("WEEK_BAN_ROLE_ID", "2001"),
        ("MOD_ROLE_ID", "2002"),
        ("ADMIN_ROLE_ID", "2003"),
        ("STAFF_LOG_CHANNEL_ID", "3000"),
        ("TICKET_OPEN_CATEGORY_ID", "4000"),
        ("TICKET_LOCKED_CATEGORY_ID", "4001"),
        ("OPENROUTER_API_KEY", "key"),
        ("OPENROUTER_MODEL", "model"),
    ]);
    Arc::new(
        BotConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))
            .expect("test config is complete"),
    )
}

pub fn l10n() -> L10nProxy {
    Arc::new(LocalizationManager::new()).get_proxy("en-US")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Dm(serenity::UserId, String),
    Message(serenity::ChannelId, String),
    Buttons(serenity::ChannelId, String, Vec<String>),
    Timeout(serenity::UserId, DateTime<Utc>),
    AddRole(serenity::UserId, serenity::RoleId),
    RemoveRole(serenity::UserId, serenity::RoleId),
    CreateChannel(serenity::ChannelId, String, serenity::ChannelId, serenity::UserId),
    SetCategory(serenity::ChannelId, serenity::ChannelId),
    SendPermission(serenity::ChannelId, serenity::UserId, bool),
    DeleteChannel(serenity::ChannelId),
    Recreate(serenity::ChannelId, serenity::ChannelId),
    React(serenity::ChannelId, serenity::MessageId, String),
    ReactionUsers(serenity::MessageId),
}

#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    reactions: Mutex<HashMap<serenity::MessageId, Vec<Reactor>>>,
    pub fail_roles: AtomicBool,
    pub fail_timeouts: AtomicBool,
    pub fail_dms: AtomicBool,
    pub fail_reactions: AtomicBool,
    pub missing_reactions: AtomicBool,
    pub fail_buttons: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(90_000),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub fn messages_in(&self, channel: serenity::ChannelId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Message(ch, text) | Call::Buttons(ch, text, _) if ch == channel => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn set_reactors(&self, message: serenity::MessageId, reactors: Vec<Reactor>) {
        self.reactions.lock().unwrap().insert(message, reactors);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), Error> {
        if flag.load(Ordering::SeqCst) {
            anyhow::bail!("Missing Permissions ({what})");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Gateway for FakeGateway {
    async fn send_dm(&self, user: serenity::UserId, content: &str) -> Result<(), Error> {
        Self::check(&self.fail_dms, "dm")?;
        self.record(Call::Dm(user, content.to_string()));
        Ok(())
    }

    async fn send_message(
        &self,
        channel: serenity::ChannelId,
        content: &str,
    ) -> Result<serenity::MessageId, Error> {
        self.record(Call::Message(channel, content.to_string()));
        Ok(serenity::MessageId::new(self.fresh_id()))
    }

    async fn send_with_buttons(
        &self,
        channel: serenity::ChannelId,
        content: &str,
        buttons: Vec<ControlButton>,
    ) -> Result<serenity::MessageId, Error> {
        Self::check(&self.fail_buttons, "buttons")?;
        self.record(Call::Buttons(
            channel,
            content.to_string(),
            buttons.into_iter().map(|b| b.custom_id).collect(),
        ));
        Ok(serenity::MessageId::new(self.fresh_id()))
    }

    async fn timeout_member(
        &self,
        user: serenity::UserId,
        until: DateTime<Utc>,
        _reason: &str,
    ) -> Result<(), Error> {
        Self::check(&self.fail_timeouts, "timeout")?;
        self.record(Call::Timeout(user, until));
        Ok(())
    }

    async fn add_role(
        &self,
        user: serenity::UserId,
        role: serenity::RoleId,
        _reason: &str,
    ) -> Result<(), Error> {
        Self::check(&self.fail_roles, "role")?;
        self.record(Call::AddRole(user, role));
        Ok(())
    }

    async fn remove_role(
        &self,
        user: serenity::UserId,
        role: serenity::RoleId,
        _reason: &str,
    ) -> Result<(), Error> {
        Self::check(&self.fail_roles, "role")?;
        self.record(Call::RemoveRole(user, role));
        Ok(())
    }

    async fn create_ticket_channel(
        &self,
        name: &str,
        category: serenity::ChannelId,
        owner: serenity::UserId,
    ) -> Result<serenity::ChannelId, Error> {
        let channel = serenity::ChannelId::new(self.fresh_id());
        self.record(Call::CreateChannel(channel, name.to_string(), category, owner));
        Ok(channel)
    }

    async fn set_category(
        &self,
        channel: serenity::ChannelId,
        category: serenity::ChannelId,
    ) -> Result<(), Error> {
        self.record(Call::SetCategory(channel, category));
        Ok(())
    }

    async fn set_send_permission(
        &self,
        channel: serenity::ChannelId,
        user: serenity::UserId,
        allowed: bool,
    ) -> Result<(), Error> {
        self.record(Call::SendPermission(channel, user, allowed));
        Ok(())
    }

    async fn delete_channel(&self, channel: serenity::ChannelId) -> Result<(), Error> {
        self.record(Call::DeleteChannel(channel));
        Ok(())
    }

    async fn recreate_channel(
        &self,
        channel: serenity::ChannelId,
    ) -> Result<serenity::ChannelId, Error> {
        let copy = serenity::ChannelId::new(self.fresh_id());
        self.record(Call::Recreate(channel, copy));
        Ok(copy)
    }

    async fn add_reaction(
        &self,
        channel: serenity::ChannelId,
        message: serenity::MessageId,
        emoji: &str,
    ) -> Result<(), Error> {
        self.record(Call::React(channel, message, emoji.to_string()));
        Ok(())
    }

    async fn reaction_users(
        &self,
        _channel: serenity::ChannelId,
        message: serenity::MessageId,
        _emoji: &str,
    ) -> Result<Vec<Reactor>, Error> {
        if self.missing_reactions.load(Ordering::SeqCst) {
            return Err(NotFound("giveaway message").into());
        }
        Self::check(&self.fail_reactions, "reactions")?;
        self.record(Call::ReactionUsers(message));
        Ok(self
            .reactions
            .lock()
            .unwrap()
            .get(&message)
            .cloned()
            .unwrap_or_default())
    }
}

/// Answers every prompt with `reply: <prompt>` and remembers what it was asked.
#[derive(Default)]
pub struct FakeResponder {
    prompts: Mutex<Vec<String>>,
}

impl FakeResponder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Responder for FakeResponder {
    async fn complete(&self, prompt: &str) -> String {
        self.prompts.lock().unwrap().push(prompt.to_string());
        // Give concurrent callers a chance to interleave
        tokio::task::yield_now().await;
        format!("reply: {prompt}")
    }
}
