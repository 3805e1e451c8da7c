use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WatchedSymbols::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WatchedSymbols::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WatchedSymbols::Symbol)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(WatchedSymbols::Exchange)
                            .string_len(30)
                            .not_null()
                            .default("binance"),
                    )
                    .col(ColumnDef::new(WatchedSymbols::Timeframes).json().not_null())
                    .col(
                        ColumnDef::new(WatchedSymbols::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(WatchedSymbols::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WatchedSymbols::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WatchedSymbols {
    Table,
    Id,
    Symbol,
    Exchange,
    Timeframes,
    IsActive,
    CreatedAt,
}
