use crate::Error;
use crate::config::BotConfig;
use crate::services::gateway::Gateway;
use crate::services::ledger::{Standing, WarningLedger};
use crate::services::localization::L10nProxy;
use chrono::{Duration, Utc};
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;
use sea_orm::DbErr;
use std::sync::Arc;
use tracing::{info, warn};

/// Substrings that earn an automatic warning, matched case-insensitively.
pub const DENYLIST: [&str; 5] = ["nsfw", "porn", "raid", "ddos", "dox"];

/// Warning count at which staff are asked to review a permanent ban.
pub const BAN_REVIEW_COUNT: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sanction {
    Timeout(Duration),
    UnderReview,
    BanReview,
}

/// The sanction ladder. Keyed on the exact count, so reaching 3 never re-applies the
/// tier for 2.
pub fn sanction_for(count: i32) -> Option<Sanction> {
    match count {
        2 => Some(Sanction::Timeout(Duration::hours(1))),
        3 => Some(Sanction::Timeout(Duration::hours(24))),
        4 => Some(Sanction::UnderReview),
        n if n >= BAN_REVIEW_COUNT => Some(Sanction::BanReview),
        _ => None,
    }
}

pub fn matches_denylist(content: &str) -> Option<&'static str> {
    let content = content.to_lowercase();
    DENYLIST.into_iter().find(|word| content.contains(word))
}

pub fn mentions_protected_user(
    mentioned: impl IntoIterator<Item = serenity::UserId>,
    protected: Option<serenity::UserId>,
) -> bool {
    protected.is_some_and(|protected| mentioned.into_iter().any(|id| id == protected))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    NotifyUser,
    AuditLog,
    Sanction(Sanction),
    BanReviewAlert,
}

#[derive(Debug)]
pub struct SideEffectFailure {
    pub effect: SideEffect,
    pub error: Error,
}

/// Result of a ledger change. The count is committed; `failures` lists the follow-up
/// actions Discord refused.
#[derive(Debug)]
pub struct WarnOutcome {
    pub count: i32,
    pub sanction: Option<Sanction>,
    pub failures: Vec<SideEffectFailure>,
}

impl WarnOutcome {
    pub fn failed(&self, effect: SideEffect) -> bool {
        self.failures.iter().any(|f| f.effect == effect)
    }
}

pub struct EscalationService {
    ledger: Arc<WarningLedger>,
    gateway: Arc<dyn Gateway>,
    config: Arc<BotConfig>,
    l10n: L10nProxy,
}

impl EscalationService {
    pub fn new(
        ledger: Arc<WarningLedger>,
        gateway: Arc<dyn Gateway>,
        config: Arc<BotConfig>,
        l10n: L10nProxy,
    ) -> Self {
        Self {
            ledger,
            gateway,
            config,
            l10n,
        }
    }

    /// Records one infraction and runs the notifications and sanction for the new count.
    pub async fn warn(&self, user_id: serenity::UserId, rule: &str) -> Result<WarnOutcome, DbErr> {
        let count = self.ledger.increment(user_id).await?;
        info!("Warned user {} for '{}' (warning {})", user_id, rule, count);

        let mut args = FluentArgs::new();
        args.set("userId", user_id.get().to_string());
        args.set("rule", rule.to_string());
        args.set("count", count.to_string());

        let mut failures = Vec::new();

        let notice = self.l10n.t("warn-dm", Some(&args));
        record(
            &mut failures,
            SideEffect::NotifyUser,
            self.gateway.send_dm(user_id, &notice).await,
        );

        let log_line = self.l10n.t("warn-log-line", Some(&args));
        record(
            &mut failures,
            SideEffect::AuditLog,
            self.gateway
                .send_message(self.config.staff_log_channel_id, &log_line)
                .await
                .map(drop),
        );

        let sanction = sanction_for(count);
        if let Some(sanction) = sanction {
            let reason = self.l10n.t("warn-reason-sanction", Some(&args));
            self.apply(user_id, sanction, &reason, &mut failures).await;
        }

        Ok(WarnOutcome {
            count,
            sanction,
            failures,
        })
    }

    /// Jumps straight to the permanent-ban review tier.
    pub async fn force_ban(&self, user_id: serenity::UserId) -> Result<WarnOutcome, DbErr> {
        let count = self.ledger.force(user_id, BAN_REVIEW_COUNT).await?;
        info!("Forced user {} to ban review (warning {})", user_id, count);

        let mut failures = Vec::new();
        self.apply(
            user_id,
            Sanction::BanReview,
            "Manual ban review",
            &mut failures,
        )
        .await;

        Ok(WarnOutcome {
            count,
            sanction: Some(Sanction::BanReview),
            failures,
        })
    }

    /// Lowers the count. Sanctions already applied stay in place.
    pub async fn revoke(&self, user_id: serenity::UserId, amount: i32) -> Result<Standing, DbErr> {
        let standing = self.ledger.decrement(user_id, amount).await?;
        info!(
            "Revoked {} warning(s) from user {} (now {:?})",
            amount, user_id, standing
        );
        Ok(standing)
    }

    pub async fn standing(&self, user_id: serenity::UserId) -> Result<Standing, DbErr> {
        self.ledger.standing(user_id).await
    }

    async fn apply(
        &self,
        user_id: serenity::UserId,
        sanction: Sanction,
        reason: &str,
        failures: &mut Vec<SideEffectFailure>,
    ) {
        let result = match sanction {
            Sanction::Timeout(duration) => {
                self.gateway
                    .timeout_member(user_id, Utc::now() + duration, reason)
                    .await
            }
            Sanction::UnderReview | Sanction::BanReview => {
                self.gateway
                    .add_role(user_id, self.config.under_review_role_id, reason)
                    .await
            }
        };
        record(failures, SideEffect::Sanction(sanction), result);

        if sanction == Sanction::BanReview {
            let mut args = FluentArgs::new();
            args.set("userId", user_id.get().to_string());
            let alert = self.l10n.t("warn-ban-review", Some(&args));
            record(
                failures,
                SideEffect::BanReviewAlert,
                self.gateway
                    .send_message(self.config.staff_log_channel_id, &alert)
                    .await
                    .map(drop),
            );
        }
    }
}

fn record(failures: &mut Vec<SideEffectFailure>, effect: SideEffect, result: Result<(), Error>) {
    if let Err(error) = result {
        warn!("Escalation side effect {:?} failed: {:?}", effect, error);
        failures.push(SideEffectFailure { effect, error });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Call, FakeGateway};
    use std::sync::atomic::Ordering;

    async fn service() -> (EscalationService, Arc<FakeGateway>) {
        let gateway = FakeGateway::new();
        let ledger = Arc::new(WarningLedger::new(testing::database().await));
        let service =
            EscalationService::new(ledger, gateway.clone(), testing::config(), testing::l10n());
        (service, gateway)
    }

    fn timeouts(gateway: &FakeGateway) -> usize {
        gateway.count(|c| matches!(c, Call::Timeout(..)))
    }

    fn role_grants(gateway: &FakeGateway) -> usize {
        gateway.count(|c| matches!(c, Call::AddRole(..)))
    }

    #[test]
    fn ladder_is_keyed_on_exact_counts() {
        assert_eq!(sanction_for(0), None);
        assert_eq!(sanction_for(1), None);
        assert_eq!(sanction_for(2), Some(Sanction::Timeout(Duration::hours(1))));
        assert_eq!(sanction_for(3), Some(Sanction::Timeout(Duration::hours(24))));
        assert_eq!(sanction_for(4), Some(Sanction::UnderReview));
        assert_eq!(sanction_for(5), Some(Sanction::BanReview));
        assert_eq!(sanction_for(9), Some(Sanction::BanReview));
    }

    #[test]
    fn denylist_is_case_insensitive_substring() {
        assert_eq!(matches_denylist("lets RAID them"), Some("raid"));
        assert_eq!(matches_denylist("I will DDoS you"), Some("ddos"));
        assert_eq!(matches_denylist("paradox"), Some("dox"));
        assert_eq!(matches_denylist("hello there"), None);
    }

    #[test]
    fn protected_mention_requires_configured_user() {
        let protected = serenity::UserId::new(77);
        let others = [serenity::UserId::new(1), serenity::UserId::new(2)];

        assert!(mentions_protected_user([protected], Some(protected)));
        assert!(!mentions_protected_user(others, Some(protected)));
        assert!(!mentions_protected_user([protected], None));
    }

    #[tokio::test]
    async fn first_warning_only_notifies() {
        let (service, gateway) = service().await;
        let user = serenity::UserId::new(42);

        let outcome = service.warn(user, "Spam").await.unwrap();

        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.sanction, None);
        assert!(outcome.failures.is_empty());
        assert_eq!(
            gateway.calls(),
            vec![
                Call::Dm(user, "Rule broken: Spam".to_string()),
                Call::Message(
                    serenity::ChannelId::new(3000),
                    "<@42> | Spam | Warning 1".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn three_warnings_apply_each_timeout_once() {
        let (service, gateway) = service().await;
        let user = serenity::UserId::new(42);

        for _ in 0..3 {
            service.warn(user, "spam").await.unwrap();
        }

        assert_eq!(service.standing(user).await.unwrap(), Standing::Count(3));
        assert_eq!(timeouts(&gateway), 2);
        assert_eq!(role_grants(&gateway), 0);

        let lengths: Vec<_> = gateway
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Timeout(_, until) => Some((until - Utc::now()).num_minutes()),
                _ => None,
            })
            .collect();
        // Allow a minute of slack for the clock moving during the test
        assert!((58..=60).contains(&lengths[0]), "{lengths:?}");
        assert!((24 * 60 - 2..=24 * 60).contains(&lengths[1]), "{lengths:?}");
    }

    #[tokio::test]
    async fn fourth_and_fifth_warnings_grant_review_role_and_alert() {
        let (service, gateway) = service().await;
        let user = serenity::UserId::new(42);
        let review_role = serenity::RoleId::new(2001);

        for _ in 0..4 {
            service.warn(user, "spam").await.unwrap();
        }
        assert_eq!(
            gateway.count(|c| *c == Call::AddRole(user, review_role)),
            1
        );

        let outcome = service.warn(user, "spam").await.unwrap();
        assert_eq!(outcome.sanction, Some(Sanction::BanReview));
        assert_eq!(role_grants(&gateway), 2);
        assert_eq!(timeouts(&gateway), 2);

        let alerts = gateway
            .messages_in(serenity::ChannelId::new(3000))
            .into_iter()
            .filter(|m| m.contains("review for permanent ban"))
            .count();
        assert_eq!(alerts, 1);
    }

    #[tokio::test]
    async fn failed_sanction_keeps_the_count() {
        let (service, gateway) = service().await;
        let user = serenity::UserId::new(42);
        gateway.fail_timeouts.store(true, Ordering::SeqCst);
        gateway.fail_dms.store(true, Ordering::SeqCst);

        service.warn(user, "spam").await.unwrap();
        let outcome = service.warn(user, "spam").await.unwrap();

        assert_eq!(outcome.count, 2);
        assert!(outcome.failed(SideEffect::Sanction(Sanction::Timeout(Duration::hours(1)))));
        assert!(outcome.failed(SideEffect::NotifyUser));
        // The audit line still went out
        assert!(!outcome.failed(SideEffect::AuditLog));
        assert_eq!(service.standing(user).await.unwrap(), Standing::Count(2));
    }

    #[tokio::test]
    async fn revoke_floors_and_leaves_sanctions_alone() {
        let (service, gateway) = service().await;
        let user = serenity::UserId::new(43);

        service.warn(user, "spam").await.unwrap();
        assert_eq!(service.revoke(user, 2).await.unwrap(), Standing::Count(0));
        assert_eq!(
            service.revoke(serenity::UserId::new(44), 1).await.unwrap(),
            Standing::NoRecord
        );
        assert_eq!(gateway.count(|c| matches!(c, Call::RemoveRole(..))), 0);
    }

    #[tokio::test]
    async fn force_ban_sets_five_and_alerts() {
        let (service, gateway) = service().await;
        let user = serenity::UserId::new(45);

        service.warn(user, "spam").await.unwrap();
        let outcome = service.force_ban(user).await.unwrap();

        assert_eq!(outcome.count, 5);
        assert_eq!(service.standing(user).await.unwrap(), Standing::Count(5));
        assert_eq!(role_grants(&gateway), 1);
        assert!(
            gateway
                .messages_in(serenity::ChannelId::new(3000))
                .iter()
                .any(|m| m.starts_with("<@45> has reached 5th warning"))
        );
    }

    #[tokio::test]
    async fn concurrent_warnings_each_see_a_distinct_count() {
        let (service, gateway) = service().await;
        let service = Arc::new(service);
        let user = serenity::UserId::new(46);

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..6 {
            let service = service.clone();
            tasks.spawn(async move { service.warn(user, "spam").await.map(|o| o.count) });
        }
        let mut counts = Vec::new();
        while let Some(result) = tasks.join_next().await {
            counts.push(result.unwrap().unwrap());
        }
        counts.sort_unstable();

        assert_eq!(counts, vec![1, 2, 3, 4, 5, 6]);
        // 2 and 3 time out, 4, 5 and 6 grant the role
        assert_eq!(timeouts(&gateway), 2);
        assert_eq!(role_grants(&gateway), 3);
    }
}
