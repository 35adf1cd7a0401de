pub mod ai;
pub mod applications;
pub mod escalation;
pub mod event_manager;
pub mod gateway;
pub mod giveaway;
pub mod ledger;
pub mod localization;
pub mod tickets;
