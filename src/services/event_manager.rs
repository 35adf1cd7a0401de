use crate::modules::EventHandler;
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

/// An event handler together with the id of the module it belongs to.
pub struct RegisteredHandler {
    pub module_id: &'static str,
    pub handler: EventHandler,
}

pub fn registered_handlers() -> Vec<RegisteredHandler> {
    crate::modules::get_modules()
        .into_iter()
        .flat_map(|module| {
            let module_id = module.definition.id;
            module
                .event_handlers
                .into_iter()
                .map(move |handler| RegisteredHandler { module_id, handler })
        })
        .collect()
}

/// Framework-level dispatch for non-command Discord events. Module handlers run one after
/// another; a failing module is logged and does not stop the rest.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot, .. } => {
            info!("Logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::GuildCreate { guild, is_new, .. } => {
            if is_new.unwrap_or(false) {
                info!("Joined new guild: {} ({})", guild.name, guild.id);
            }
        }
        _ => {}
    }

    for registered in &data.event_handlers {
        if let Err(e) = (registered.handler)(ctx, event, data).await {
            error!(
                "Error in event handler for module {}: {:?}",
                registered.module_id, e
            );
        }
    }

    Ok(())
}
