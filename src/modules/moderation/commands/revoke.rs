use crate::modules::ensure_staff;
use crate::services::ledger::Standing;
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;

/// Revoke warnings from a user
#[poise::command(slash_command, guild_only)]
pub async fn revoke(
    ctx: Context<'_>,
    #[description = "User to revoke warnings from"] user: serenity::User,
    #[description = "How many warnings to remove"]
    #[min = 1]
    amount: i32,
) -> Result<(), Error> {
    if !ensure_staff(ctx).await? {
        return Ok(());
    }

    let standing = ctx.data().escalation.revoke(user.id, amount).await?;

    let reply = {
        let mut args = FluentArgs::new();
        args.set("userId", user.id.get().to_string());
        args.set("amount", amount.to_string());
        match standing {
            Standing::NoRecord => ctx.l10n_user().t("mod-revoke-no-record", Some(&args)),
            Standing::Count(count) => {
                args.set("count", count.to_string());
                ctx.l10n_user().t("mod-revoke-success", Some(&args))
            }
        }
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}
