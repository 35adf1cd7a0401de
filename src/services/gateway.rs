use crate::Error;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// A clickable control attached to a bot message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlButton {
    pub custom_id: String,
    pub label: String,
    pub style: serenity::ButtonStyle,
}

/// Someone who reacted to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reactor {
    pub id: serenity::UserId,
    pub bot: bool,
}

/// The channel or message a call targeted no longer exists.
#[derive(Debug, thiserror::Error)]
#[error("{0} not found")]
pub struct NotFound(pub &'static str);

/// Every Discord side effect the engines need. Keeping them behind one trait lets the
/// ledger, ticket and giveaway logic run against a recording double in tests.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    async fn send_dm(&self, user: serenity::UserId, content: &str) -> Result<(), Error>;

    async fn send_message(
        &self,
        channel: serenity::ChannelId,
        content: &str,
    ) -> Result<serenity::MessageId, Error>;

    async fn send_with_buttons(
        &self,
        channel: serenity::ChannelId,
        content: &str,
        buttons: Vec<ControlButton>,
    ) -> Result<serenity::MessageId, Error>;

    async fn timeout_member(
        &self,
        user: serenity::UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), Error>;

    async fn add_role(
        &self,
        user: serenity::UserId,
        role: serenity::RoleId,
        reason: &str,
    ) -> Result<(), Error>;

    async fn remove_role(
        &self,
        user: serenity::UserId,
        role: serenity::RoleId,
        reason: &str,
    ) -> Result<(), Error>;

    /// Creates a text channel only `owner`, the bot and moderators can write in.
    async fn create_ticket_channel(
        &self,
        name: &str,
        category: serenity::ChannelId,
        owner: serenity::UserId,
    ) -> Result<serenity::ChannelId, Error>;

    async fn set_category(
        &self,
        channel: serenity::ChannelId,
        category: serenity::ChannelId,
    ) -> Result<(), Error>;

    async fn set_send_permission(
        &self,
        channel: serenity::ChannelId,
        user: serenity::UserId,
        allowed: bool,
    ) -> Result<(), Error>;

    async fn delete_channel(&self, channel: serenity::ChannelId) -> Result<(), Error>;

    /// Replaces a channel with a fresh copy at the same position; returns the copy.
    async fn recreate_channel(
        &self,
        channel: serenity::ChannelId,
    ) -> Result<serenity::ChannelId, Error>;

    async fn add_reaction(
        &self,
        channel: serenity::ChannelId,
        message: serenity::MessageId,
        emoji: &str,
    ) -> Result<(), Error>;

    async fn reaction_users(
        &self,
        channel: serenity::ChannelId,
        message: serenity::MessageId,
        emoji: &str,
    ) -> Result<Vec<Reactor>, Error>;
}

pub struct SerenityGateway {
    http: Arc<serenity::Http>,
    guild_id: serenity::GuildId,
    bot_id: serenity::UserId,
}

impl SerenityGateway {
    pub fn new(
        http: Arc<serenity::Http>,
        guild_id: serenity::GuildId,
        bot_id: serenity::UserId,
    ) -> Self {
        Self {
            http,
            guild_id,
            bot_id,
        }
    }

    fn http(&self) -> &serenity::Http {
        &self.http
    }
}

const REACTION_PAGE_SIZE: u8 = 100;

fn is_not_found(error: &serenity::HttpError) -> bool {
    matches!(
        error,
        serenity::HttpError::UnsuccessfulRequest(response) if response.status_code.as_u16() == 404
    )
}

/// Turns a 404 into [`NotFound`] so callers can tell a deleted target from a hiccup.
fn classify(error: serenity::Error, what: &'static str) -> Error {
    match &error {
        serenity::Error::Http(http) if is_not_found(http) => NotFound(what).into(),
        _ => error.into(),
    }
}

#[async_trait::async_trait]
impl Gateway for SerenityGateway {
    async fn send_dm(&self, user: serenity::UserId, content: &str) -> Result<(), Error> {
        user.direct_message(self.http(), serenity::CreateMessage::new().content(content))
            .await?;
        Ok(())
    }

    async fn send_message(
        &self,
        channel: serenity::ChannelId,
        content: &str,
    ) -> Result<serenity::MessageId, Error> {
        let message = channel
            .send_message(self.http(), serenity::CreateMessage::new().content(content))
            .await?;
        Ok(message.id)
    }

    async fn send_with_buttons(
        &self,
        channel: serenity::ChannelId,
        content: &str,
        buttons: Vec<ControlButton>,
    ) -> Result<serenity::MessageId, Error> {
        let buttons = buttons
            .into_iter()
            .map(|b| {
                serenity::CreateButton::new(b.custom_id)
                    .label(b.label)
                    .style(b.style)
            })
            .collect();

        let message = channel
            .send_message(
                self.http(),
                serenity::CreateMessage::new()
                    .content(content)
                    .components(vec![serenity::CreateActionRow::Buttons(buttons)]),
            )
            .await?;
        Ok(message.id)
    }

    async fn timeout_member(
        &self,
        user: serenity::UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), Error> {
        self.guild_id
            .edit_member(
                self.http(),
                user,
                serenity::EditMember::new()
                    .disable_communication_until_datetime(until.into())
                    .audit_log_reason(reason),
            )
            .await?;
        Ok(())
    }

    async fn add_role(
        &self,
        user: serenity::UserId,
        role: serenity::RoleId,
        reason: &str,
    ) -> Result<(), Error> {
        self.http
            .add_member_role(self.guild_id, user, role, Some(reason))
            .await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        user: serenity::UserId,
        role: serenity::RoleId,
        reason: &str,
    ) -> Result<(), Error> {
        self.http
            .remove_member_role(self.guild_id, user, role, Some(reason))
            .await?;
        Ok(())
    }

    async fn create_ticket_channel(
        &self,
        name: &str,
        category: serenity::ChannelId,
        owner: serenity::UserId,
    ) -> Result<serenity::ChannelId, Error> {
        let writer = serenity::Permissions::VIEW_CHANNEL | serenity::Permissions::SEND_MESSAGES;
        let overwrites = vec![
            serenity::PermissionOverwrite {
                allow: serenity::Permissions::empty(),
                deny: serenity::Permissions::SEND_MESSAGES,
                kind: serenity::PermissionOverwriteType::Role(self.guild_id.everyone_role()),
            },
            serenity::PermissionOverwrite {
                allow: writer,
                deny: serenity::Permissions::empty(),
                kind: serenity::PermissionOverwriteType::Member(owner),
            },
            serenity::PermissionOverwrite {
                allow: writer,
                deny: serenity::Permissions::empty(),
                kind: serenity::PermissionOverwriteType::Member(self.bot_id),
            },
        ];

        let channel = self
            .guild_id
            .create_channel(
                self.http(),
                serenity::CreateChannel::new(name)
                    .kind(serenity::ChannelType::Text)
                    .category(category)
                    .permissions(overwrites),
            )
            .await?;
        Ok(channel.id)
    }

    async fn set_category(
        &self,
        channel: serenity::ChannelId,
        category: serenity::ChannelId,
    ) -> Result<(), Error> {
        channel
            .edit(self.http(), serenity::EditChannel::new().category(Some(category)))
            .await?;
        Ok(())
    }

    async fn set_send_permission(
        &self,
        channel: serenity::ChannelId,
        user: serenity::UserId,
        allowed: bool,
    ) -> Result<(), Error> {
        let (allow, deny) = if allowed {
            (
                serenity::Permissions::VIEW_CHANNEL | serenity::Permissions::SEND_MESSAGES,
                serenity::Permissions::empty(),
            )
        } else {
            (
                serenity::Permissions::VIEW_CHANNEL,
                serenity::Permissions::SEND_MESSAGES,
            )
        };

        channel
            .create_permission(
                self.http(),
                serenity::PermissionOverwrite {
                    allow,
                    deny,
                    kind: serenity::PermissionOverwriteType::Member(user),
                },
            )
            .await?;
        Ok(())
    }

    async fn delete_channel(&self, channel: serenity::ChannelId) -> Result<(), Error> {
        channel.delete(self.http()).await?;
        Ok(())
    }

    async fn recreate_channel(
        &self,
        channel: serenity::ChannelId,
    ) -> Result<serenity::ChannelId, Error> {
        let original = channel
            .to_channel(self.http())
            .await?
            .guild()
            .ok_or_else(|| anyhow::anyhow!("Channel {} is not a guild channel", channel))?;

        let mut builder = serenity::CreateChannel::new(original.name.clone())
            .kind(original.kind)
            .nsfw(original.nsfw)
            .position(original.position)
            .permissions(original.permission_overwrites.clone());
        if let Some(parent) = original.parent_id {
            builder = builder.category(parent);
        }
        if let Some(topic) = &original.topic {
            builder = builder.topic(topic.clone());
        }
        if let Some(slowmode) = original.rate_limit_per_user {
            builder = builder.rate_limit_per_user(slowmode);
        }

        let copy = self.guild_id.create_channel(self.http(), builder).await?;
        channel.delete(self.http()).await?;

        // Deleting the original shifts positions, so pin the copy again
        copy.id
            .edit(
                self.http(),
                serenity::EditChannel::new().position(original.position),
            )
            .await?;

        Ok(copy.id)
    }

    async fn add_reaction(
        &self,
        channel: serenity::ChannelId,
        message: serenity::MessageId,
        emoji: &str,
    ) -> Result<(), Error> {
        channel
            .create_reaction(
                self.http(),
                message,
                serenity::ReactionType::Unicode(emoji.to_string()),
            )
            .await?;
        Ok(())
    }

    async fn reaction_users(
        &self,
        channel: serenity::ChannelId,
        message: serenity::MessageId,
        emoji: &str,
    ) -> Result<Vec<Reactor>, Error> {
        let reaction = serenity::ReactionType::Unicode(emoji.to_string());
        let mut reactors = Vec::new();
        let mut after = None;

        loop {
            let page = channel
                .reaction_users(
                    self.http(),
                    message,
                    reaction.clone(),
                    Some(REACTION_PAGE_SIZE),
                    after,
                )
                .await
                .map_err(|e| classify(e, "giveaway message"))?;

            let page_len = page.len();
            after = page.last().map(|u| u.id);
            reactors.extend(page.into_iter().map(|u| Reactor {
                id: u.id,
                bot: u.bot,
            }));

            if page_len < REACTION_PAGE_SIZE as usize {
                break;
            }
        }

        Ok(reactors)
    }
}
