use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alerts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(Alerts::TriggeredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alerts::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(Alerts::Kind).string_len(30).not_null())
                    .col(ColumnDef::new(Alerts::Severity).string_len(10).not_null())
                    .col(ColumnDef::new(Alerts::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Alerts::Description).text())
                    .col(ColumnDef::new(Alerts::TriggerContext).json())
                    .col(ColumnDef::new(Alerts::CompositeScore).decimal_len(5, 4))
                    .col(ColumnDef::new(Alerts::WindowBucket).string_len(40).not_null())
                    .col(ColumnDef::new(Alerts::EntityId).string_len(60))
                    .col(
                        ColumnDef::new(Alerts::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Alerts::AcknowledgedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Alerts::DismissedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Dedup lookup: one active alert per (kind, symbol, window_bucket).
        manager
            .create_index(
                Index::create()
                    .name("idx_alerts_dedup")
                    .table(Alerts::Table)
                    .col(Alerts::Kind)
                    .col(Alerts::Symbol)
                    .col(Alerts::WindowBucket)
                    .col(Alerts::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AlertCursors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AlertCursors::Symbol).string_len(20).not_null())
                    .col(ColumnDef::new(AlertCursors::Timeframe).string_len(5).not_null())
                    .col(
                        ColumnDef::new(AlertCursors::LastTriggeredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AlertCursors::LastComposite)
                            .decimal_len(5, 4)
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(AlertCursors::Symbol)
                            .col(AlertCursors::Timeframe),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AlertCursors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Alerts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Alerts {
    Table,
    Id,
    CreatedAt,
    TriggeredAt,
    Symbol,
    Kind,
    Severity,
    Title,
    Description,
    TriggerContext,
    CompositeScore,
    WindowBucket,
    EntityId,
    Status,
    AcknowledgedAt,
    DismissedAt,
}

#[derive(Iden)]
enum AlertCursors {
    Table,
    Symbol,
    Timeframe,
    LastTriggeredAt,
    LastComposite,
}
