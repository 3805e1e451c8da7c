use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Lease rows are the only cross-worker mutex. A job fires only after a
        // conditional upsert wins the (job_name) row with a fresh expires_at.
        manager
            .create_table(
                Table::create()
                    .table(JobLeases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobLeases::JobName)
                            .string_len(60)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobLeases::OwnerId).string_len(60).not_null())
                    .col(
                        ColumnDef::new(JobLeases::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BacktestResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BacktestResults::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BacktestResults::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(BacktestResults::Params).json().not_null())
                    .col(ColumnDef::new(BacktestResults::Report).json().not_null())
                    .col(
                        ColumnDef::new(BacktestResults::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BacktestResults::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(JobLeases::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum JobLeases {
    Table,
    JobName,
    OwnerId,
    ExpiresAt,
}

#[derive(Iden)]
enum BacktestResults {
    Table,
    Id,
    Kind,
    Params,
    Report,
    CreatedAt,
}
