use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Giveaways::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Giveaways::MessageId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Giveaways::ChannelId).big_integer().not_null())
                    .col(ColumnDef::new(Giveaways::EndTime).date_time().not_null())
                    .col(ColumnDef::new(Giveaways::Prize).string().not_null())
                    .col(ColumnDef::new(Giveaways::ResolvedAt).date_time())
                    .to_owned(),
            )
            .await?;

        // The sweep scans by end time every few seconds
        manager
            .create_index(
                Index::create()
                    .name("idx-giveaways-end-time")
                    .table(Giveaways::Table)
                    .col(Giveaways::EndTime)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Giveaways::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Giveaways {
    Table,
    MessageId,
    ChannelId,
    EndTime,
    Prize,
    ResolvedAt,
}
