use crate::modules::ensure_staff;
use crate::services::localization::ContextL10nExt;
use crate::services::tickets::CREATE_TICKET_ID;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Post the button members use to open a support ticket
#[poise::command(slash_command, guild_only)]
pub async fn ticketpanel(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_staff(ctx).await? {
        return Ok(());
    }

    let l10n = ctx.l10n_user();
    let open = serenity::CreateButton::new(CREATE_TICKET_ID)
        .label(l10n.t("ticket-button-open", None))
        .style(serenity::ButtonStyle::Primary);

    ctx.send(
        poise::CreateReply::default()
            .content(l10n.t("ticket-panel", None))
            .components(vec![serenity::CreateActionRow::Buttons(vec![open])]),
    )
    .await?;
    Ok(())
}
