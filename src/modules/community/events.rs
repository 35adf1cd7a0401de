use crate::{Data, Error};
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;
use tracing::info;

pub fn handler<'a>(
    _ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> poise::BoxFuture<'a, Result<(), Error>> {
    Box::pin(async move {
        if let serenity::FullEvent::GuildMemberAddition { new_member } = event {
            welcome(new_member, data).await?;
        }
        Ok(())
    })
}

async fn welcome(member: &serenity::Member, data: &Data) -> Result<(), Error> {
    let Some(channel) = data.config.welcome_channel_id else {
        return Ok(());
    };
    if member.guild_id != data.config.guild_id {
        return Ok(());
    }

    let prompt = {
        let mut args = FluentArgs::new();
        args.set("username", member.user.name.clone());
        args.set("community", data.config.community_name.clone());
        data.l10n.get_proxy("en-US").t("ai-prompt-welcome", Some(&args))
    };
    let greeting = data.responder.complete(&prompt).await;

    data.gateway.send_message(channel, &greeting).await?;
    info!("Welcomed {} in {}", member.user.id, channel);
    Ok(())
}
