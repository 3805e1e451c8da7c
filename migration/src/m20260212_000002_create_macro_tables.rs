use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Generic keyed series store: one row per (series_key, timestamp).
        // Keys: wti, dxy, dgs2, dgs10, dfii10, m2, fed_balance_sheet,
        // net_liquidity, usdjpy, vix, jpy_positioning_z, inventory_change.
        manager
            .create_table(
                Table::create()
                    .table(MacroSeries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MacroSeries::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MacroSeries::SeriesKey).string_len(30).not_null())
                    .col(ColumnDef::new(MacroSeries::Value).decimal_len(20, 8).not_null())
                    .primary_key(
                        Index::create()
                            .col(MacroSeries::Timestamp)
                            .col(MacroSeries::SeriesKey),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_macro_series_key_time")
                    .table(MacroSeries::Table)
                    .col(MacroSeries::SeriesKey)
                    .col((MacroSeries::Timestamp, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MacroSignal::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MacroSignal::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MacroSignal::LiquidityScore).decimal_len(5, 4))
                    .col(ColumnDef::new(MacroSignal::TreasuryScore).decimal_len(5, 4))
                    .col(ColumnDef::new(MacroSignal::DollarScore).decimal_len(5, 4))
                    .col(ColumnDef::new(MacroSignal::OilScore).decimal_len(5, 4))
                    .col(ColumnDef::new(MacroSignal::CarryTradeScore).decimal_len(5, 4))
                    .col(ColumnDef::new(MacroSignal::CarryStress).decimal_len(5, 4))
                    .col(ColumnDef::new(MacroSignal::Regime).string_len(20))
                    .col(ColumnDef::new(MacroSignal::RegimeConfidence).decimal_len(5, 4))
                    .col(ColumnDef::new(MacroSignal::SubSignals).json())
                    .col(ColumnDef::new(MacroSignal::Score).decimal_len(5, 4))
                    .col(
                        ColumnDef::new(MacroSignal::Degraded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MacroSignal::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MacroSeries::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MacroSeries {
    Table,
    Timestamp,
    SeriesKey,
    Value,
}

#[derive(Iden)]
enum MacroSignal {
    Table,
    Timestamp,
    LiquidityScore,
    TreasuryScore,
    DollarScore,
    OilScore,
    CarryTradeScore,
    CarryStress,
    Regime,
    RegimeConfidence,
    SubSignals,
    Score,
    Degraded,
}
