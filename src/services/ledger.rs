use crate::db::entities::warnings;
use poise::serenity_prelude as serenity;
use sea_orm::sea_query::{Expr, OnConflict, Query, SimpleExpr};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

/// A user's position in the warning ledger. No row means the user was never warned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    NoRecord,
    Count(i32),
}

impl Standing {
    pub fn count(self) -> i32 {
        match self {
            Standing::NoRecord => 0,
            Standing::Count(n) => n,
        }
    }
}

/// Per-user warning counters. Every mutation is a single SQL statement, so concurrent
/// callers never lose an update.
pub struct WarningLedger {
    db: DatabaseConnection,
}

impl WarningLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Adds one warning and returns the new total.
    pub async fn increment(&self, user_id: serenity::UserId) -> Result<i32, DbErr> {
        self.upsert(
            user_id,
            1,
            Expr::col((warnings::Entity, warnings::Column::Count)).add(1),
        )
        .await
    }

    /// Overwrites the total, creating the row if needed.
    pub async fn force(&self, user_id: serenity::UserId, count: i32) -> Result<i32, DbErr> {
        let count = count.max(0);
        self.upsert(user_id, count, Expr::value(count)).await
    }

    /// Removes up to `amount` warnings; the total never drops below zero.
    pub async fn decrement(
        &self,
        user_id: serenity::UserId,
        amount: i32,
    ) -> Result<Standing, DbErr> {
        let amount = amount.max(0);

        warnings::Entity::update_many()
            .col_expr(
                warnings::Column::Count,
                Expr::case(
                    Expr::col(warnings::Column::Count).gt(amount),
                    Expr::col(warnings::Column::Count).sub(amount),
                )
                .finally(0)
                .into(),
            )
            .filter(warnings::Column::UserId.eq(user_id.get() as i64))
            .exec(&self.db)
            .await?;

        self.standing(user_id).await
    }

    pub async fn standing(&self, user_id: serenity::UserId) -> Result<Standing, DbErr> {
        let record = warnings::Entity::find_by_id(user_id.get() as i64)
            .one(&self.db)
            .await?;

        Ok(record.map_or(Standing::NoRecord, |r| Standing::Count(r.count)))
    }

    async fn upsert(
        &self,
        user_id: serenity::UserId,
        initial: i32,
        on_conflict: SimpleExpr,
    ) -> Result<i32, DbErr> {
        let stmt = Query::insert()
            .into_table(warnings::Entity)
            .columns([warnings::Column::UserId, warnings::Column::Count])
            .values_panic([(user_id.get() as i64).into(), initial.into()])
            .on_conflict(
                OnConflict::column(warnings::Column::UserId)
                    .value(warnings::Column::Count, on_conflict)
                    .to_owned(),
            )
            .returning_col(warnings::Column::Count)
            .to_owned();

        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(backend.build(&stmt))
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("warning upsert returned no row".into()))?;

        row.try_get("", "count")
    }
}
