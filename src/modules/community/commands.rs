use crate::modules::ensure_staff;
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

const RULES: &str = include_str!("../../../assets/rules.md");
const INVITE_REWARD: &str = include_str!("../../../assets/invite_reward.md");
const GROUP_URL: &str = "https://www.roblox.com/share/g/46230128";

/// Send the server rules
#[poise::command(slash_command, guild_only)]
pub async fn rules(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_staff(ctx).await? {
        return Ok(());
    }

    ctx.say(RULES.trim_end()).await?;
    Ok(())
}

/// Send invite reward info
#[poise::command(slash_command, guild_only)]
pub async fn invitereward(ctx: Context<'_>) -> Result<(), Error> {
    if !ensure_staff(ctx).await? {
        return Ok(());
    }

    let join = serenity::CreateButton::new_link(GROUP_URL)
        .label(ctx.l10n_user().t("invite-join-group", None));

    ctx.send(
        poise::CreateReply::default()
            .content(INVITE_REWARD.trim_end())
            .components(vec![serenity::CreateActionRow::Buttons(vec![join])]),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Discord rejects message content above 2000 characters
    #[test]
    fn static_texts_fit_in_one_message() {
        for text in [RULES, INVITE_REWARD] {
            let text = text.trim_end();
            assert!(!text.is_empty());
            assert!(text.chars().count() <= 2000);
        }
    }
}
