use crate::modules::ensure_staff;
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;

/// Remove the permanent-ban review role
#[poise::command(slash_command, guild_only)]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "User to clear from ban review"] user: serenity::User,
) -> Result<(), Error> {
    if !ensure_staff(ctx).await? {
        return Ok(());
    }

    let data = ctx.data();
    data.gateway
        .remove_role(
            user.id,
            data.config.under_review_role_id,
            &format!("Ban review cleared by {}", ctx.author().name),
        )
        .await?;

    let reply = {
        let mut args = FluentArgs::new();
        args.set("userId", user.id.get().to_string());
        ctx.l10n_user().t("mod-unban-success", Some(&args))
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}
