use crate::Error;
use crate::config::BotConfig;
use crate::services::ai::Responder;
use crate::services::gateway::{ControlButton, Gateway};
use crate::services::localization::L10nProxy;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const CREATE_TICKET_ID: &str = "ticket-create";
pub const CONTINUE_ID: &str = "ticket-continue";
pub const PING_STAFF_ID: &str = "ticket-ping";
pub const CLOSE_ID: &str = "ticket-close";

const MAX_CHANNEL_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketPhase {
    /// Channel just opened; the owner may write.
    Created,
    /// The owner wrote and is locked out until they press Continue.
    AwaitingReply,
    /// Continue was pressed; the owner may write again.
    AwaitingUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketSession {
    pub owner: serenity::UserId,
    pub phase: TicketPhase,
}

impl TicketSession {
    pub fn waiting_for_user(&self) -> bool {
        self.phase != TicketPhase::AwaitingReply
    }
}

/// What a ticket event ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ignored,
    Locked,
    Unlocked,
    StaffPinged,
    Closed,
    NotAllowed,
}

// `None` once the ticket is closed, so tasks still queued on the lock back off.
type Slot = Arc<Mutex<Option<TicketSession>>>;

/// Live ticket channels. Sessions exist only in memory and are lost on restart.
pub struct TicketService {
    sessions: DashMap<serenity::ChannelId, Slot>,
    // One ticket per member. `None` while the channel is still being created.
    owners: DashMap<serenity::UserId, Option<serenity::ChannelId>>,
    gateway: Arc<dyn Gateway>,
    responder: Arc<dyn Responder>,
    config: Arc<BotConfig>,
    l10n: L10nProxy,
}

impl TicketService {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        responder: Arc<dyn Responder>,
        config: Arc<BotConfig>,
        l10n: L10nProxy,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            owners: DashMap::new(),
            gateway,
            responder,
            config,
            l10n,
        }
    }

    pub fn is_open(&self, channel: serenity::ChannelId) -> bool {
        self.sessions.contains_key(&channel)
    }

    #[cfg(test)]
    pub async fn session(&self, channel: serenity::ChannelId) -> Option<TicketSession> {
        let slot = self.slot(channel)?;
        let session = slot.lock().await.clone();
        session
    }

    /// The ticket channel `owner` currently has, if any.
    pub fn ticket_of(&self, owner: serenity::UserId) -> Option<serenity::ChannelId> {
        self.owners.get(&owner).and_then(|entry| *entry.value())
    }

    /// Opens a private channel for `owner` and greets them. Messages from the owner wait
    /// until the greeting is out. Returns `None` when the owner already has a ticket.
    pub async fn open(
        &self,
        owner: serenity::UserId,
        owner_name: &str,
    ) -> Result<Option<serenity::ChannelId>, Error> {
        match self.owners.entry(owner) {
            Entry::Occupied(existing) => {
                info!(
                    "User {} already has ticket {:?}, not opening another",
                    owner,
                    existing.get()
                );
                return Ok(None);
            }
            Entry::Vacant(slot) => {
                slot.insert(None);
            }
        }

        let channel = match self
            .gateway
            .create_ticket_channel(
                &channel_name(owner_name),
                self.config.ticket_open_category_id,
                owner,
            )
            .await
        {
            Ok(channel) => channel,
            Err(e) => {
                self.owners.remove(&owner);
                return Err(e);
            }
        };
        self.owners.insert(owner, Some(channel));

        let slot: Slot = Arc::new(Mutex::new(Some(TicketSession {
            owner,
            phase: TicketPhase::Created,
        })));
        let _guard = slot.lock().await;
        self.sessions.insert(channel, slot.clone());
        info!("Opened ticket {} for user {}", channel, owner);

        let mut args = FluentArgs::new();
        args.set("username", owner_name.to_string());
        let prompt = self.l10n.t("ai-prompt-ticket-greeting", Some(&args));
        let greeting = self.responder.complete(&prompt).await;

        log_failure(
            "post ticket greeting",
            channel,
            self.gateway.send_message(channel, &greeting).await.map(drop),
        );

        Ok(Some(channel))
    }

    /// Handles a message posted in a ticket channel. Only the owner's message while the
    /// ticket waits for them does anything, and it costs exactly one AI call.
    pub async fn handle_message(
        &self,
        channel: serenity::ChannelId,
        author: serenity::UserId,
        content: &str,
    ) -> Transition {
        let Some(slot) = self.slot(channel) else {
            return Transition::Ignored;
        };
        let mut guard = slot.lock().await;
        let Some(session) = guard.as_mut() else {
            return Transition::Ignored;
        };
        if session.owner != author || !session.waiting_for_user() {
            return Transition::Ignored;
        }

        session.phase = TicketPhase::AwaitingReply;
        let owner = session.owner;

        log_failure(
            "move ticket to locked category",
            channel,
            self.gateway
                .set_category(channel, self.config.ticket_locked_category_id)
                .await,
        );
        log_failure(
            "revoke owner send permission",
            channel,
            self.gateway.set_send_permission(channel, owner, false).await,
        );

        let mut args = FluentArgs::new();
        args.set("content", content.to_string());
        let prompt = self.l10n.t("ai-prompt-ticket-message", Some(&args));
        let reply = self.responder.complete(&prompt).await;

        if let Err(e) = self
            .gateway
            .send_with_buttons(channel, &reply, self.controls())
            .await
        {
            // Without the controls nobody could unlock the channel again
            warn!(
                "Failed to post ticket reply in {}, reopening for the owner: {:?}",
                channel, e
            );
            self.unlock(channel, owner).await;
            if let Some(session) = guard.as_mut() {
                session.phase = TicketPhase::AwaitingUser;
            }
            return Transition::Unlocked;
        }

        Transition::Locked
    }

    /// The Continue control: hand the channel back to the owner. No AI call.
    pub async fn resume(
        &self,
        channel: serenity::ChannelId,
        actor: serenity::UserId,
        actor_is_staff: bool,
    ) -> Transition {
        let Some(slot) = self.slot(channel) else {
            return Transition::Ignored;
        };
        let mut guard = slot.lock().await;
        let Some(session) = guard.as_mut() else {
            return Transition::Ignored;
        };
        if session.owner != actor && !actor_is_staff {
            return Transition::NotAllowed;
        }
        if session.phase != TicketPhase::AwaitingReply {
            return Transition::Ignored;
        }

        session.phase = TicketPhase::AwaitingUser;
        let owner = session.owner;
        self.unlock(channel, owner).await;

        Transition::Unlocked
    }

    pub async fn ping_staff(&self, channel: serenity::ChannelId) -> Result<Transition, Error> {
        if !self.is_open(channel) {
            return Ok(Transition::Ignored);
        }

        let mut args = FluentArgs::new();
        args.set("roleId", self.config.staff_role_id.get().to_string());
        let mention = self.l10n.t("ticket-staff-ping", Some(&args));
        self.gateway.send_message(channel, &mention).await?;

        Ok(Transition::StaffPinged)
    }

    /// The Close control: forget the session and delete the channel.
    pub async fn close(
        &self,
        channel: serenity::ChannelId,
        actor: serenity::UserId,
        actor_is_staff: bool,
    ) -> Result<Transition, Error> {
        let Some(slot) = self.slot(channel) else {
            return Ok(Transition::Ignored);
        };
        let mut guard = slot.lock().await;
        match guard.as_ref() {
            None => return Ok(Transition::Ignored),
            Some(session) if session.owner != actor && !actor_is_staff => {
                return Ok(Transition::NotAllowed);
            }
            Some(_) => {}
        }

        if let Some(session) = guard.take() {
            self.release_owner(session.owner, channel);
        }
        self.sessions.remove(&channel);
        info!("Closed ticket {}", channel);

        self.gateway.delete_channel(channel).await?;
        Ok(Transition::Closed)
    }

    /// Drops a session whose channel disappeared without the Close control.
    pub async fn forget(&self, channel: serenity::ChannelId) {
        if let Some((_, slot)) = self.sessions.remove(&channel) {
            if let Some(session) = slot.lock().await.take() {
                self.release_owner(session.owner, channel);
            }
            info!("Forgot ticket {} after its channel was deleted", channel);
        }
    }

    pub fn controls(&self) -> Vec<ControlButton> {
        vec![
            ControlButton {
                custom_id: CONTINUE_ID.to_string(),
                label: self.l10n.t("ticket-button-continue", None),
                style: serenity::ButtonStyle::Success,
            },
            ControlButton {
                custom_id: PING_STAFF_ID.to_string(),
                label: self.l10n.t("ticket-button-ping", None),
                style: serenity::ButtonStyle::Primary,
            },
            ControlButton {
                custom_id: CLOSE_ID.to_string(),
                label: self.l10n.t("ticket-button-close", None),
                style: serenity::ButtonStyle::Danger,
            },
        ]
    }

    fn release_owner(&self, owner: serenity::UserId, channel: serenity::ChannelId) {
        self.owners.remove_if(&owner, |_, open| *open == Some(channel));
    }

    fn slot(&self, channel: serenity::ChannelId) -> Option<Slot> {
        self.sessions.get(&channel).map(|entry| entry.value().clone())
    }

    async fn unlock(&self, channel: serenity::ChannelId, owner: serenity::UserId) {
        log_failure(
            "move ticket to open category",
            channel,
            self.gateway
                .set_category(channel, self.config.ticket_open_category_id)
                .await,
        );
        log_failure(
            "restore owner send permission",
            channel,
            self.gateway.set_send_permission(channel, owner, true).await,
        );
    }
}

fn log_failure(action: &str, channel: serenity::ChannelId, result: Result<(), Error>) {
    if let Err(e) = result {
        warn!("Failed to {} for ticket {}: {:?}", action, channel, e);
    }
}

/// `ticket-<name>` squeezed into Discord's channel naming rules.
pub fn channel_name(username: &str) -> String {
    let mut name = String::from("ticket-");
    for c in username.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' {
            name.push(c);
        } else if !name.ends_with('-') {
            name.push('-');
        }
    }

    let trimmed = name.trim_end_matches('-');
    let name = if trimmed == "ticket" { "ticket-user" } else { trimmed };
    name.chars().take(MAX_CHANNEL_NAME_LEN).collect()
}
