use crate::modules::ensure_staff;
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;

/// Show how many warnings a user has
#[poise::command(slash_command, guild_only)]
pub async fn warnings(
    ctx: Context<'_>,
    #[description = "User to look up"] user: serenity::User,
) -> Result<(), Error> {
    if !ensure_staff(ctx).await? {
        return Ok(());
    }

    let standing = ctx.data().escalation.standing(user.id).await?;

    let reply = {
        let mut args = FluentArgs::new();
        args.set("userId", user.id.get().to_string());
        args.set("count", standing.count().to_string());
        ctx.l10n_user().t("mod-warnings-count", Some(&args))
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}
