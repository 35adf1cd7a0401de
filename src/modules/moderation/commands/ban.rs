use crate::modules::ensure_staff;
use crate::services::escalation::{Sanction, SideEffect};
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;

/// Give a member the permanent-ban review role
#[poise::command(slash_command, guild_only)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "User to send to ban review"] user: serenity::User,
) -> Result<(), Error> {
    if !ensure_staff(ctx).await? {
        return Ok(());
    }

    let outcome = ctx.data().escalation.force_ban(user.id).await?;

    let key = if outcome.failed(SideEffect::Sanction(Sanction::BanReview)) {
        "mod-ban-partial"
    } else {
        "mod-ban-success"
    };
    let reply = {
        let mut args = FluentArgs::new();
        args.set("userId", user.id.get().to_string());
        ctx.l10n_user().t(key, Some(&args))
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}
