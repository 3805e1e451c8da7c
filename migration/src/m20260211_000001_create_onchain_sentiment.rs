use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OnchainMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OnchainMetrics::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OnchainMetrics::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(OnchainMetrics::ExchangeNetflow).decimal_len(20, 8))
                    .col(ColumnDef::new(OnchainMetrics::Nupl).decimal_len(10, 4))
                    .col(ColumnDef::new(OnchainMetrics::MvrvZscore).decimal_len(10, 4))
                    .col(ColumnDef::new(OnchainMetrics::Sopr).decimal_len(10, 4))
                    .col(ColumnDef::new(OnchainMetrics::WhaleTxCount).integer())
                    .col(ColumnDef::new(OnchainMetrics::ActiveAddresses).big_integer())
                    .col(ColumnDef::new(OnchainMetrics::Score).decimal_len(5, 4))
                    .col(
                        ColumnDef::new(OnchainMetrics::Degraded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(
                        Index::create()
                            .col(OnchainMetrics::Timestamp)
                            .col(OnchainMetrics::Symbol),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SentimentData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SentimentData::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SentimentData::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(SentimentData::FearGreedIndex).integer())
                    .col(ColumnDef::new(SentimentData::FearGreedLabel).string_len(30))
                    .col(ColumnDef::new(SentimentData::SocialScore).decimal_len(5, 4))
                    .col(ColumnDef::new(SentimentData::TrendsScore).decimal_len(5, 4))
                    .col(ColumnDef::new(SentimentData::Score).decimal_len(5, 4))
                    .col(
                        ColumnDef::new(SentimentData::Degraded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(
                        Index::create()
                            .col(SentimentData::Timestamp)
                            .col(SentimentData::Symbol),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SentimentData::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OnchainMetrics::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum OnchainMetrics {
    Table,
    Timestamp,
    Symbol,
    ExchangeNetflow,
    Nupl,
    MvrvZscore,
    Sopr,
    WhaleTxCount,
    ActiveAddresses,
    Score,
    Degraded,
}

#[derive(Iden)]
enum SentimentData {
    Table,
    Timestamp,
    Symbol,
    FearGreedIndex,
    FearGreedLabel,
    SocialScore,
    TrendsScore,
    Score,
    Degraded,
}
