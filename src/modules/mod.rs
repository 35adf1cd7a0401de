pub mod community;
pub mod giveaways;
pub mod moderation;
pub mod tickets;

use crate::config::BotConfig;
use crate::{Context, Data, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    pub id: &'static str,
    pub description: &'static str,
}

pub type EventHandler = for<'a> fn(
    &'a serenity::Context,
    &'a serenity::FullEvent,
    &'a Data,
) -> poise::BoxFuture<'a, Result<(), Error>>;

pub struct Module {
    pub definition: ModuleDefinition,
    pub commands: Vec<poise::Command<Data, Error>>,
    pub event_handlers: Vec<EventHandler>,
}

pub fn get_modules() -> Vec<Module> {
    vec![
        moderation::module(),
        community::module(),
        tickets::module(),
        giveaways::module(),
    ]
}

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    let mut all_commands = vec![];

    for mut module in get_modules() {
        let category = module.definition.id;
        for command in &mut module.commands {
            command.category = Some(category.into());
        }
        all_commands.extend(module.commands);
    }

    all_commands
}

/// Gate for staff-only commands. `None` is an invoker with no member record,
/// such as a user outside the guild, and is always refused.
pub fn may_run_gated(config: &BotConfig, roles: Option<&[serenity::RoleId]>) -> bool {
    roles.is_some_and(|roles| config.is_staff(roles))
}

/// Whether the invoking member holds a staff, mod or admin role. Anyone else gets a
/// silent ephemeral deferral and the command should stop.
pub async fn ensure_staff(ctx: Context<'_>) -> Result<bool, Error> {
    let member = ctx.author_member().await;
    let allowed = may_run_gated(
        &ctx.data().config,
        member.as_ref().map(|m| m.roles.as_slice()),
    );

    if !allowed {
        ctx.defer_ephemeral().await?;
    }
    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn role(id: u64) -> serenity::RoleId {
        serenity::RoleId::new(id)
    }

    #[test]
    fn outsiders_are_refused() {
        assert!(!may_run_gated(&testing::config(), None));
    }

    #[test]
    fn members_without_a_staff_role_are_refused() {
        let config = testing::config();
        assert!(!may_run_gated(&config, Some(&[][..])));
        assert!(!may_run_gated(&config, Some(&[role(2001), role(9)][..])));
    }

    #[test]
    fn staff_mod_and_admin_roles_all_pass() {
        let config = testing::config();
        for staff in [2000, 2002, 2003] {
            assert!(
                may_run_gated(&config, Some(&[role(9), role(staff)][..])),
                "role {staff} should pass"
            );
        }
    }

    #[test]
    fn unset_mod_and_admin_roles_grant_nothing() {
        let config = crate::config::BotConfig {
            mod_role_id: None,
            admin_role_id: None,
            ..(*testing::config()).clone()
        };
        assert!(may_run_gated(&config, Some(&[role(2000)][..])));
        assert!(!may_run_gated(&config, Some(&[role(2002)][..])));
        assert!(!may_run_gated(&config, Some(&[role(2003)][..])));
    }
}
