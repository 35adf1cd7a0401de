use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ModApps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModApps::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ModApps::Username).string().not_null())
                    .col(ColumnDef::new(ModApps::UserId).string().not_null())
                    .col(ColumnDef::new(ModApps::Reason).text().not_null())
                    .col(
                        ColumnDef::new(ModApps::SubmittedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModApps::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ModApps {
    Table,
    Id,
    Username,
    UserId,
    Reason,
    SubmittedAt,
}
