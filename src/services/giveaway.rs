use crate::Error;
use crate::db::entities::giveaways;
use crate::services::gateway::{Gateway, NotFound, Reactor};
use crate::services::localization::L10nProxy;
use chrono::{Duration, NaiveDateTime, Utc};
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;
use rand::Rng;
use rand::seq::SliceRandom;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

pub const ENTRY_EMOJI: &str = "🎉";

/// How long after the first failed attempt a giveaway whose entrants cannot be read is retried.
const RETRY_WINDOW_MINUTES: i64 = 10;

/// A claim older than this belongs to a sweep that died before deleting the row.
const STALE_CLAIM_MINUTES: i64 = 5;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub winners: Vec<serenity::UserId>,
    pub without_entrants: usize,
    /// Claims handed back because entrants could not be fetched yet.
    pub released: usize,
    /// Giveaways retired without a draw; the channel is told.
    pub abandoned: usize,
    pub purged: u64,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Distinct human entrants, in a stable order.
pub fn eligible_entrants(reactors: impl IntoIterator<Item = Reactor>) -> Vec<serenity::UserId> {
    let mut entrants: Vec<_> = reactors
        .into_iter()
        .filter(|r| !r.bot)
        .map(|r| r.id)
        .collect();
    entrants.sort_unstable();
    entrants.dedup();
    entrants
}

pub fn pick_winner<R: Rng + ?Sized>(
    entrants: &[serenity::UserId],
    rng: &mut R,
) -> Option<serenity::UserId> {
    entrants.choose(rng).copied()
}

pub struct GiveawayService {
    db: DatabaseConnection,
    gateway: Arc<dyn Gateway>,
    l10n: L10nProxy,
}

impl GiveawayService {
    pub fn new(db: DatabaseConnection, gateway: Arc<dyn Gateway>, l10n: L10nProxy) -> Self {
        Self { db, gateway, l10n }
    }

    /// Posts the announcement, seeds the entry reaction and persists the giveaway.
    pub async fn start(
        &self,
        channel: serenity::ChannelId,
        prize: &str,
        minutes: u32,
    ) -> Result<giveaways::Model, Error> {
        let end_time = Utc::now().naive_utc() + Duration::minutes(i64::from(minutes));

        let mut args = FluentArgs::new();
        args.set("prize", prize.to_string());
        args.set("minutes", minutes.to_string());
        let announcement = self.l10n.t("giveaway-announcement", Some(&args));

        let message = self.gateway.send_message(channel, &announcement).await?;
        if let Err(e) = self
            .gateway
            .add_reaction(channel, message, ENTRY_EMOJI)
            .await
        {
            // People can still add the reaction themselves
            warn!("Failed to seed giveaway reaction on {}: {:?}", message, e);
        }

        let giveaway = giveaways::ActiveModel {
            message_id: Set(message.get() as i64),
            channel_id: Set(channel.get() as i64),
            end_time: Set(end_time),
            prize: Set(prize.to_string()),
            resolved_at: Set(None),
            first_failure_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        info!(
            "Giveaway {} for '{}' ends at {}",
            message, prize, giveaway.end_time
        );
        Ok(giveaway)
    }

    pub async fn pending(&self) -> Result<Vec<giveaways::Model>, DbErr> {
        giveaways::Entity::find()
            .filter(giveaways::Column::ResolvedAt.is_null())
            .all(&self.db)
            .await
    }

    /// Resolves every giveaway that ended at or before `now`. Each row is claimed with a
    /// conditional update first, so overlapping sweeps never draw the same giveaway twice.
    pub async fn sweep(&self, now: NaiveDateTime) -> Result<SweepReport, DbErr> {
        let mut report = SweepReport {
            purged: giveaways::Entity::delete_many()
                .filter(giveaways::Column::ResolvedAt.lt(now - Duration::minutes(STALE_CLAIM_MINUTES)))
                .exec(&self.db)
                .await?
                .rows_affected,
            ..Default::default()
        };

        let due = giveaways::Entity::find()
            .filter(giveaways::Column::EndTime.lte(now))
            .filter(giveaways::Column::ResolvedAt.is_null())
            .all(&self.db)
            .await?;

        for giveaway in due {
            if !self.claim(&giveaway, now).await? {
                continue;
            }
            self.resolve(&giveaway, now, &mut report).await?;
        }

        Ok(report)
    }

    pub fn start_sweep_runner(self: Arc<Self>, period: std::time::Duration) {
        tokio::spawn(async move {
            match self.pending().await {
                Ok(pending) => info!(
                    "Giveaway sweep runner started with {} pending giveaway(s).",
                    pending.len()
                ),
                Err(e) => error!("Failed to count pending giveaways: {:?}", e),
            }
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match self.sweep(Utc::now().naive_utc()).await {
                    Ok(report) if !report.is_empty() => {
                        info!("Giveaway sweep finished: {:?}", report);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Giveaway sweep failed: {:?}", e);
                    }
                }
            }
        });
    }

    async fn claim(&self, giveaway: &giveaways::Model, now: NaiveDateTime) -> Result<bool, DbErr> {
        let result = giveaways::Entity::update_many()
            .col_expr(giveaways::Column::ResolvedAt, Expr::value(now))
            .filter(giveaways::Column::MessageId.eq(giveaway.message_id))
            .filter(giveaways::Column::ResolvedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Hands the claim back for the next sweep, remembering when the failures started.
    async fn release(
        &self,
        giveaway: &giveaways::Model,
        first_failure: NaiveDateTime,
    ) -> Result<(), DbErr> {
        giveaways::Entity::update_many()
            .col_expr(
                giveaways::Column::ResolvedAt,
                Expr::value(Option::<NaiveDateTime>::None),
            )
            .col_expr(
                giveaways::Column::FirstFailureAt,
                Expr::value(Some(first_failure)),
            )
            .filter(giveaways::Column::MessageId.eq(giveaway.message_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn retire(&self, giveaway: &giveaways::Model) -> Result<(), DbErr> {
        giveaways::Entity::delete_by_id(giveaway.message_id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn abandon(
        &self,
        giveaway: &giveaways::Model,
        channel: serenity::ChannelId,
        report: &mut SweepReport,
    ) -> Result<(), DbErr> {
        let mut args = FluentArgs::new();
        args.set("prize", giveaway.prize.clone());
        let notice = self.l10n.t("giveaway-abandoned", Some(&args));
        if let Err(e) = self.gateway.send_message(channel, &notice).await {
            warn!(
                "Failed to post abandoned notice for giveaway {}: {:?}",
                giveaway.message_id, e
            );
        }

        self.retire(giveaway).await?;
        report.abandoned += 1;
        Ok(())
    }

    async fn resolve(
        &self,
        giveaway: &giveaways::Model,
        now: NaiveDateTime,
        report: &mut SweepReport,
    ) -> Result<(), DbErr> {
        let channel = serenity::ChannelId::new(giveaway.channel_id as u64);
        let message = serenity::MessageId::new(giveaway.message_id as u64);

        let reactors = match self
            .gateway
            .reaction_users(channel, message, ENTRY_EMOJI)
            .await
        {
            Ok(reactors) => reactors,
            Err(e) if e.downcast_ref::<NotFound>().is_some() => {
                error!(
                    "Giveaway {} for '{}' was deleted before the draw: {:?}",
                    message, giveaway.prize, e
                );
                return self.abandon(giveaway, channel, report).await;
            }
            Err(e) => {
                let first_failure = giveaway.first_failure_at.unwrap_or(now);
                if now - first_failure < Duration::minutes(RETRY_WINDOW_MINUTES) {
                    warn!(
                        "Could not read entrants of giveaway {}, retrying next sweep: {:?}",
                        message, e
                    );
                    self.release(giveaway, first_failure).await?;
                    report.released += 1;
                    return Ok(());
                }

                error!(
                    "Giving up on giveaway {} for '{}' after {} minutes of failures: {:?}",
                    message,
                    giveaway.prize,
                    (now - first_failure).num_minutes(),
                    e
                );
                return self.abandon(giveaway, channel, report).await;
            }
        };

        let entrants = eligible_entrants(reactors);
        let winner = pick_winner(&entrants, &mut rand::thread_rng());

        let mut args = FluentArgs::new();
        args.set("prize", giveaway.prize.clone());
        let announcement = match winner {
            Some(winner) => {
                args.set("userId", winner.get().to_string());
                report.winners.push(winner);
                self.l10n.t("giveaway-winner", Some(&args))
            }
            None => {
                report.without_entrants += 1;
                self.l10n.t("giveaway-no-entrants", Some(&args))
            }
        };

        info!(
            "Giveaway {} for '{}' resolved with {} entrant(s), winner {:?}",
            message,
            giveaway.prize,
            entrants.len(),
            winner
        );
        if let Err(e) = self.gateway.send_message(channel, &announcement).await {
            error!("Failed to announce giveaway {} result: {:?}", message, e);
        }

        self.retire(giveaway).await
    }
}
