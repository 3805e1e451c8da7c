use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ConfluenceScores::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConfluenceScores::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ConfluenceScores::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(ConfluenceScores::Timeframe).string_len(5).not_null())
                    .col(ColumnDef::new(ConfluenceScores::TaScore).decimal_len(5, 4))
                    .col(ColumnDef::new(ConfluenceScores::OnchainScore).decimal_len(5, 4))
                    .col(ColumnDef::new(ConfluenceScores::CelestialScore).decimal_len(5, 4))
                    .col(ColumnDef::new(ConfluenceScores::NumerologyScore).decimal_len(5, 4))
                    .col(ColumnDef::new(ConfluenceScores::SentimentScore).decimal_len(5, 4))
                    .col(ColumnDef::new(ConfluenceScores::PoliticalScore).decimal_len(5, 4))
                    .col(ColumnDef::new(ConfluenceScores::MacroScore).decimal_len(5, 4))
                    .col(ColumnDef::new(ConfluenceScores::Weights).json().not_null())
                    .col(ColumnDef::new(ConfluenceScores::CompositeScore).decimal_len(5, 4))
                    .col(ColumnDef::new(ConfluenceScores::SignalStrength).string_len(12))
                    .col(ColumnDef::new(ConfluenceScores::AlignedLayers).json())
                    .col(ColumnDef::new(ConfluenceScores::AlignmentCount).integer())
                    .col(ColumnDef::new(ConfluenceScores::StaleLayers).json())
                    .primary_key(
                        Index::create()
                            .col(ConfluenceScores::Timestamp)
                            .col(ConfluenceScores::Symbol)
                            .col(ConfluenceScores::Timeframe),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_confluence_symbol_tf_time")
                    .table(ConfluenceScores::Table)
                    .col(ConfluenceScores::Symbol)
                    .col(ConfluenceScores::Timeframe)
                    .col((ConfluenceScores::Timestamp, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SignalWeights::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SignalWeights::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SignalWeights::ProfileName)
                            .string_len(50)
                            .not_null()
                            .default("default"),
                    )
                    .col(ColumnDef::new(SignalWeights::TaWeight).decimal_len(5, 4).not_null())
                    .col(ColumnDef::new(SignalWeights::OnchainWeight).decimal_len(5, 4).not_null())
                    .col(ColumnDef::new(SignalWeights::CelestialWeight).decimal_len(5, 4).not_null())
                    .col(ColumnDef::new(SignalWeights::NumerologyWeight).decimal_len(5, 4).not_null())
                    .col(ColumnDef::new(SignalWeights::SentimentWeight).decimal_len(5, 4).not_null())
                    .col(ColumnDef::new(SignalWeights::PoliticalWeight).decimal_len(5, 4).not_null())
                    .col(ColumnDef::new(SignalWeights::MacroWeight).decimal_len(5, 4).not_null())
                    .col(
                        ColumnDef::new(SignalWeights::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SignalWeights::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(SignalWeights::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SignalWeights::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ConfluenceScores::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ConfluenceScores {
    Table,
    Timestamp,
    Symbol,
    Timeframe,
    TaScore,
    OnchainScore,
    CelestialScore,
    NumerologyScore,
    SentimentScore,
    PoliticalScore,
    MacroScore,
    Weights,
    CompositeScore,
    SignalStrength,
    AlignedLayers,
    AlignmentCount,
    StaleLayers,
}

#[derive(Iden)]
enum SignalWeights {
    Table,
    Id,
    ProfileName,
    TaWeight,
    OnchainWeight,
    CelestialWeight,
    NumerologyWeight,
    SentimentWeight,
    PoliticalWeight,
    MacroWeight,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
