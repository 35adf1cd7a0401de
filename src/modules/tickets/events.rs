use crate::services::tickets::{CLOSE_ID, CONTINUE_ID, CREATE_TICKET_ID, PING_STAFF_ID, Transition};
use crate::{Data, Error};
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;
use tracing::{debug, info};

pub fn handler<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> poise::BoxFuture<'a, Result<(), Error>> {
    Box::pin(async move {
        match event {
            serenity::FullEvent::Message { new_message } => {
                handle_message(new_message, data).await?;
            }
            serenity::FullEvent::InteractionCreate {
                interaction: serenity::Interaction::Component(component),
            } => {
                handle_component(ctx, component, data).await?;
            }
            serenity::FullEvent::ChannelDelete { channel, .. } => {
                data.tickets.forget(channel.id).await;
            }
            _ => {}
        }
        Ok(())
    })
}

async fn handle_message(message: &serenity::Message, data: &Data) -> Result<(), Error> {
    if message.author.bot || message.guild_id != Some(data.config.guild_id) {
        return Ok(());
    }

    if data.config.ticket_intake_channel_id == Some(message.channel_id) {
        match data
            .tickets
            .open(message.author.id, &message.author.name)
            .await?
        {
            Some(channel) => info!(
                "Opened ticket {} from intake message by {}",
                channel, message.author.id
            ),
            None => debug!(
                "Ignoring intake message from {}, who already has a ticket",
                message.author.id
            ),
        }
        return Ok(());
    }

    if !data.tickets.is_open(message.channel_id) {
        return Ok(());
    }

    let transition = data
        .tickets
        .handle_message(message.channel_id, message.author.id, &message.content)
        .await;
    debug!(
        "Ticket {} message from {}: {:?}",
        message.channel_id, message.author.id, transition
    );
    Ok(())
}

async fn handle_component(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let custom_id = component.data.custom_id.as_str();
    if ![CREATE_TICKET_ID, CONTINUE_ID, PING_STAFF_ID, CLOSE_ID].contains(&custom_id) {
        return Ok(());
    }

    let l10n = data.l10n.get_proxy(&component.locale);

    if custom_id == CREATE_TICKET_ID {
        component.defer_ephemeral(ctx).await?;
        let opened = data
            .tickets
            .open(component.user.id, &component.user.name)
            .await?;
        let reply = match opened {
            Some(_) => l10n.t("ticket-created", None),
            None => {
                let mut args = FluentArgs::new();
                let existing = data.tickets.ticket_of(component.user.id);
                args.set(
                    "channelId",
                    existing.map(|c| c.get().to_string()).unwrap_or_default(),
                );
                l10n.t("ticket-already-open", Some(&args))
            }
        };
        component
            .edit_response(ctx, serenity::EditInteractionResponse::new().content(reply))
            .await?;
        return Ok(());
    }

    // Acknowledge before the channel can disappear under a Close
    component
        .create_response(ctx, serenity::CreateInteractionResponse::Acknowledge)
        .await?;

    let channel = component.channel_id;
    let actor = component.user.id;
    let actor_is_staff = component
        .member
        .as_ref()
        .is_some_and(|m| data.config.is_staff(&m.roles));

    let transition = match custom_id {
        CONTINUE_ID => data.tickets.resume(channel, actor, actor_is_staff).await,
        PING_STAFF_ID => data.tickets.ping_staff(channel).await?,
        _ => data.tickets.close(channel, actor, actor_is_staff).await?,
    };
    debug!("Ticket {} control {} by {}: {:?}", channel, custom_id, actor, transition);

    if transition == Transition::NotAllowed {
        component
            .create_followup(
                ctx,
                serenity::CreateInteractionResponseFollowup::new()
                    .content(l10n.t("ticket-not-allowed", None))
                    .ephemeral(true),
            )
            .await?;
    }

    Ok(())
}
