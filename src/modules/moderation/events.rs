use crate::services::ai::Responder;
use crate::services::escalation::{EscalationService, matches_denylist, mentions_protected_user};
use crate::services::gateway::Gateway;
use crate::services::localization::L10nProxy;
use crate::{Data, Error};
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

pub fn handler<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> poise::BoxFuture<'a, Result<(), Error>> {
    Box::pin(async move {
        if let serenity::FullEvent::Message { new_message } = event {
            handle_message(ctx, new_message, data).await?;
        }
        Ok(())
    })
}

/// Automod rule hit by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infraction {
    ForbiddenPing,
    Denylisted(&'static str),
}

impl Infraction {
    fn rule_key(self) -> &'static str {
        match self {
            Infraction::ForbiddenPing => "rule-forbidden-ping",
            Infraction::Denylisted(_) => "rule-inappropriate-content",
        }
    }
}

/// Both rules are checked independently, so one message may break both.
pub fn infractions(
    content: &str,
    mentioned: impl IntoIterator<Item = serenity::UserId>,
    protected: Option<serenity::UserId>,
) -> Vec<Infraction> {
    let mut found = Vec::new();
    if mentions_protected_user(mentioned, protected) {
        found.push(Infraction::ForbiddenPing);
    }
    if let Some(word) = matches_denylist(content) {
        found.push(Infraction::Denylisted(word));
    }
    found
}

async fn handle_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    if message.author.bot {
        return Ok(());
    }
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    if guild_id != data.config.guild_id {
        return Ok(());
    }

    let l10n = data.l10n.get_proxy("en-US");
    let found = infractions(
        &message.content,
        message.mentions.iter().map(|u| u.id),
        data.config.protected_user_id,
    );
    if found.is_empty() {
        return Ok(());
    }

    let guild_name = ctx
        .cache
        .guild(guild_id)
        .map(|g| g.name.clone())
        .unwrap_or_else(|| data.config.community_name.clone());

    let automod = Automod {
        escalation: &data.escalation,
        gateway: data.gateway.as_ref(),
        responder: data.responder.as_ref(),
        l10n: &l10n,
    };
    automod
        .enforce(message.author.id, message.channel_id, &guild_name, &found)
        .await;

    Ok(())
}

/// Everything needed to act on the infractions of a single message.
struct Automod<'a> {
    escalation: &'a EscalationService,
    gateway: &'a dyn Gateway,
    responder: &'a dyn Responder,
    l10n: &'a L10nProxy,
}

impl Automod<'_> {
    /// Each infraction is handled on its own; a failure on one never skips the next.
    async fn enforce(
        &self,
        author: serenity::UserId,
        channel: serenity::ChannelId,
        guild_name: &str,
        found: &[Infraction],
    ) {
        for &infraction in found {
            let rule = self.l10n.t(infraction.rule_key(), None);
            match self.escalation.warn(author, &rule).await {
                Ok(outcome) => info!(
                    "Automod warned {} for {:?} in {} (warning {}, sanction {:?})",
                    author, infraction, channel, outcome.count, outcome.sanction
                ),
                Err(e) => error!(
                    "Failed to record {:?} warning for {}: {:?}",
                    infraction, author, e
                ),
            }

            if infraction == Infraction::ForbiddenPing {
                self.admonish(author, guild_name).await;
            }
        }
    }

    async fn admonish(&self, author: serenity::UserId, guild_name: &str) {
        let prompt = {
            let mut args = FluentArgs::new();
            args.set("guild", guild_name.to_string());
            self.l10n.t("ai-prompt-forbidden-ping", Some(&args))
        };
        let admonishment = self.responder.complete(&prompt).await;
        if let Err(e) = self.gateway.send_dm(author, &admonishment).await {
            warn!("Failed to DM forbidden-ping notice to {}: {:?}", author, e);
        }
    }
}
