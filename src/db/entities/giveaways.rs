use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Eq)]
#[sea_orm(table_name = "giveaways")]
pub struct Model {
    /// Id of the announcement message people react to.
    #[sea_orm(primary_key, auto_increment = false)]
    pub message_id: i64,
    pub channel_id: i64,
    pub end_time: DateTime,
    pub prize: String,
    /// Set when a sweep claims the giveaway; a claimed row is never drawn again.
    pub resolved_at: Option<DateTime>,
    /// First sweep that could not read the entrants; the retry window counts from here.
    pub first_failure_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
