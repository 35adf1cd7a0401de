use anyhow::Context as _;
use clap::Parser as _;
use dotenvy::dotenv;
use poise::serenity_prelude as serenity;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod modules;
mod services;
#[cfg(test)]
mod testing;

use config::BotConfig;
use services::ai::{OpenRouterClient, Responder};
use services::escalation::EscalationService;
use services::event_manager::RegisteredHandler;
use services::gateway::{Gateway, SerenityGateway};
use services::giveaway::GiveawayService;
use services::ledger::WarningLedger;
use services::localization::{ContextL10nExt, LocalizationManager};
use services::tickets::TicketService;

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Publish commands. If no guild ID is provided, publish globally.
    #[arg(long, num_args = 0..)]
    publish: Option<Vec<u64>>,

    /// Clear all commands instead of publishing them.
    #[arg(long)]
    clear: bool,

    /// Rollback the specified number of migrations and run all migrations again.
    #[arg(long, num_args = 0..=1, default_missing_value = "1")]
    refresh_migrations: Option<u32>,
}

// Custom user data passed to all command functions
pub struct Data {
    pub config: Arc<BotConfig>,
    pub l10n: Arc<LocalizationManager>,
    pub gateway: Arc<dyn Gateway>,
    pub responder: Arc<dyn Responder>,
    pub escalation: Arc<EscalationService>,
    pub tickets: Arc<TicketService>,
    pub giveaways: Arc<GiveawayService>,
    pub event_handlers: Vec<RegisteredHandler>,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Dungeon Warden...");

    let token = std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN must be set")?;

    // Handle command registration if requested
    if let Some(publish_args) = args.publish {
        publish_commands(&token, publish_args, args.clear).await?;
        return Ok(());
    }

    let config = Arc::new(BotConfig::from_env().context("Invalid configuration")?);
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    // Establish database connection
    let db = db::establish_connection(&database_url)
        .await
        .context("Failed to connect to database")?;

    // Run migrations
    if let Some(depth) = args.refresh_migrations {
        info!("Refreshing migrations (down {}, then up)...", depth);
        db::migrations::Migrator::down(&db, Some(depth))
            .await
            .context("Failed to rollback migration")?;
    }

    db::migrations::Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;

    if args.refresh_migrations.is_some() {
        info!("Migrations refreshed successfully.");
        return Ok(());
    }

    let l10n = Arc::new(LocalizationManager::new());
    let responder: Arc<dyn Responder> = Arc::new(
        OpenRouterClient::new(&config.ai).context("Failed to build AI client")?,
    );

    for module in modules::get_modules() {
        info!(
            "Loaded module {} ({} commands): {}",
            module.definition.id,
            module.commands.len(),
            module.definition.description
        );
    }

    // Start the moderator application form
    tokio::spawn(services::applications::serve(db.clone(), config.http_port));

    let framework_options = poise::FrameworkOptions {
        commands: modules::commands(),
        on_error: |error| Box::pin(on_error(error)),
        event_handler: |ctx, event, framework, data| {
            Box::pin(services::event_manager::handle_event(
                ctx, event, framework, data,
            ))
        },
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .options(framework_options)
        .setup(move |ctx, ready, _framework| {
            Box::pin(async move {
                let gateway: Arc<dyn Gateway> = Arc::new(SerenityGateway::new(
                    ctx.http.clone(),
                    config.guild_id,
                    ready.user.id,
                ));
                let proxy = l10n.get_proxy("en-US");

                let ledger = Arc::new(WarningLedger::new(db.clone()));
                let escalation = Arc::new(EscalationService::new(
                    ledger,
                    gateway.clone(),
                    config.clone(),
                    proxy.clone(),
                ));
                let tickets = Arc::new(TicketService::new(
                    gateway.clone(),
                    responder.clone(),
                    config.clone(),
                    proxy.clone(),
                ));
                let giveaways = Arc::new(GiveawayService::new(db, gateway.clone(), proxy));

                // Start giveaway sweep runner
                giveaways
                    .clone()
                    .start_sweep_runner(config.giveaway_sweep_interval);

                info!("Bot is ready!");
                Ok(Data {
                    config,
                    l10n,
                    gateway,
                    responder,
                    escalation,
                    tickets,
                    giveaways,
                    event_handlers: services::event_manager::registered_handlers(),
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .context("Failed to create client")?;

    client.start().await.context("Client error")?;

    Ok(())
}

async fn publish_commands(token: &str, guild_ids: Vec<u64>, clear: bool) -> anyhow::Result<()> {
    let http = serenity::HttpBuilder::new(token).build();
    let application_id = http
        .get_current_application_info()
        .await
        .context("Failed to fetch application info")?
        .id;

    info!("Fetched Application ID: {}", application_id);

    let http = serenity::HttpBuilder::new(token)
        .application_id(application_id)
        .build();

    let all_commands = modules::commands();
    let commands: &[poise::Command<Data, Error>] = if clear { &[] } else { &all_commands };

    if guild_ids.is_empty() {
        if clear {
            info!("Clearing commands globally...");
        } else {
            info!("Registering commands globally...");
        }

        if let Err(e) = poise::builtins::register_globally(&http, commands).await {
            error!("Failed to register commands globally: {}", e);
        } else {
            info!("Global command operation successful");
        }
    } else {
        for guild_id in guild_ids {
            if clear {
                info!("Clearing commands in guild {}...", guild_id);
            } else {
                info!("Registering commands in guild {}...", guild_id);
            }

            if let Err(e) =
                poise::builtins::register_in_guild(&http, commands, serenity::GuildId::new(guild_id))
                    .await
            {
                error!("Failed to register commands in guild {}: {}", guild_id, e);
            } else {
                info!("Guild command operation successful for guild {}", guild_id);
            }
        }
    }

    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start the framework: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Error in command `{}` invoked by {}: {:?}",
                ctx.command().qualified_name,
                ctx.author().id,
                error
            );
            let reply = poise::CreateReply::default()
                .content(ctx.l10n_user().t("command-error", None))
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to report command error: {:?}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {:?}", e);
            }
        }
    }
}
