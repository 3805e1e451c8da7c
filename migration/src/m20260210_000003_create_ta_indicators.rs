use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TaIndicators::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaIndicators::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TaIndicators::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(TaIndicators::Timeframe).string_len(5).not_null())
                    .col(ColumnDef::new(TaIndicators::Rsi7).decimal_len(10, 4))
                    .col(ColumnDef::new(TaIndicators::Rsi14).decimal_len(10, 4))
                    .col(ColumnDef::new(TaIndicators::MacdLine).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::MacdSignal).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::MacdHistogram).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::StochK).decimal_len(10, 4))
                    .col(ColumnDef::new(TaIndicators::StochD).decimal_len(10, 4))
                    .col(ColumnDef::new(TaIndicators::Sma20).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::Sma50).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::Sma200).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::Ema12).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::Ema26).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::BbUpper).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::BbMiddle).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::BbLower).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::Atr14).decimal_len(20, 8))
                    .col(ColumnDef::new(TaIndicators::FibLevels).json())
                    .col(ColumnDef::new(TaIndicators::SubSignals).json())
                    .col(ColumnDef::new(TaIndicators::Score).decimal_len(5, 4))
                    .col(
                        ColumnDef::new(TaIndicators::Degraded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(
                        Index::create()
                            .col(TaIndicators::Timestamp)
                            .col(TaIndicators::Symbol)
                            .col(TaIndicators::Timeframe),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ta_symbol_tf_time")
                    .table(TaIndicators::Table)
                    .col(TaIndicators::Symbol)
                    .col(TaIndicators::Timeframe)
                    .col((TaIndicators::Timestamp, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaIndicators::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum TaIndicators {
    Table,
    Timestamp,
    Symbol,
    Timeframe,
    Rsi7,
    Rsi14,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    StochK,
    StochD,
    Sma20,
    Sma50,
    Sma200,
    Ema12,
    Ema26,
    BbUpper,
    BbMiddle,
    BbLower,
    Atr14,
    FibLevels,
    SubSignals,
    Score,
    Degraded,
}
