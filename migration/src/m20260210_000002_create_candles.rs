use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Composite primary key enforces at-most-one candle per
        // (timestamp, symbol, exchange, timeframe); late corrections are upserts.
        manager
            .create_table(
                Table::create()
                    .table(Candles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Candles::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Candles::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(Candles::Exchange).string_len(30).not_null())
                    .col(ColumnDef::new(Candles::Timeframe).string_len(5).not_null())
                    .col(ColumnDef::new(Candles::Open).decimal_len(20, 8))
                    .col(ColumnDef::new(Candles::High).decimal_len(20, 8))
                    .col(ColumnDef::new(Candles::Low).decimal_len(20, 8))
                    .col(ColumnDef::new(Candles::Close).decimal_len(20, 8))
                    .col(ColumnDef::new(Candles::Volume).decimal_len(20, 8))
                    .primary_key(
                        Index::create()
                            .col(Candles::Timestamp)
                            .col(Candles::Symbol)
                            .col(Candles::Exchange)
                            .col(Candles::Timeframe),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_candles_symbol_tf_time")
                    .table(Candles::Table)
                    .col(Candles::Symbol)
                    .col(Candles::Timeframe)
                    .col((Candles::Timestamp, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Candles::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Candles {
    Table,
    Timestamp,
    Symbol,
    Exchange,
    Timeframe,
    Open,
    High,
    Low,
    Close,
    Volume,
}
