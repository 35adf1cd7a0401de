use crate::modules::ensure_staff;
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use fluent::FluentArgs;

/// Start a giveaway in this channel
#[poise::command(slash_command, guild_only)]
pub async fn giveaway(
    ctx: Context<'_>,
    #[description = "What the winner gets"] prize: String,
    #[description = "How long entries stay open, in minutes"]
    #[min = 1]
    #[max = 10080]
    minutes: u32,
) -> Result<(), Error> {
    if !ensure_staff(ctx).await? {
        return Ok(());
    }

    ctx.defer_ephemeral().await?;
    ctx.data()
        .giveaways
        .start(ctx.channel_id(), &prize, minutes)
        .await?;

    let reply = {
        let mut args = FluentArgs::new();
        args.set("prize", prize);
        ctx.l10n_user().t("giveaway-started", Some(&args))
    };
    ctx.say(reply).await?;
    Ok(())
}
