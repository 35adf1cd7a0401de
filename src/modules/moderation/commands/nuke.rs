use crate::modules::ensure_staff;
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use fluent::FluentArgs;
use tracing::info;

/// Wipe this channel by replacing it with a fresh copy
#[poise::command(slash_command, guild_only)]
pub async fn nuke(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_staff(ctx).await? {
        return Ok(());
    }

    // The reply channel is about to disappear
    ctx.defer_ephemeral().await?;

    let data = ctx.data();
    let original = ctx.channel_id();
    let copy = data.gateway.recreate_channel(original).await?;
    info!(
        "Channel {} nuked by {}, replaced by {}",
        original,
        ctx.author().id,
        copy
    );

    let notice = {
        let mut args = FluentArgs::new();
        args.set("userId", ctx.author().id.get().to_string());
        ctx.l10n_user().t("mod-nuke-done", Some(&args))
    };
    data.gateway.send_message(copy, &notice).await?;

    Ok(())
}
