use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PoliticalCalendar::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PoliticalCalendar::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PoliticalCalendar::EventDate).date().not_null())
                    .col(ColumnDef::new(PoliticalCalendar::EventType).string_len(40).not_null())
                    .col(ColumnDef::new(PoliticalCalendar::Category).string_len(30))
                    .col(ColumnDef::new(PoliticalCalendar::Title).string_len(200).not_null())
                    .col(ColumnDef::new(PoliticalCalendar::Description).text())
                    .col(ColumnDef::new(PoliticalCalendar::Country).string_len(10))
                    .col(
                        ColumnDef::new(PoliticalCalendar::ExpectedVolatility)
                            .string_len(10)
                            .not_null()
                            .default("medium"),
                    )
                    .col(ColumnDef::new(PoliticalCalendar::ExpectedDirection).decimal_len(5, 4))
                    .col(ColumnDef::new(PoliticalCalendar::CryptoRelevance).decimal_len(5, 4))
                    .col(
                        ColumnDef::new(PoliticalCalendar::IsRecurring)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PoliticalCalendar::RecurrenceRule).string_len(20))
                    .col(ColumnDef::new(PoliticalCalendar::ActualImpactPct).decimal_len(10, 4))
                    .col(ColumnDef::new(PoliticalCalendar::OutcomeNotes).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_political_calendar_date_type")
                    .table(PoliticalCalendar::Table)
                    .col(PoliticalCalendar::EventDate)
                    .col(PoliticalCalendar::EventType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PoliticalNews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PoliticalNews::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PoliticalNews::SourceName).string_len(100).not_null())
                    .col(ColumnDef::new(PoliticalNews::HeadlineHash).string_len(64).not_null())
                    .col(ColumnDef::new(PoliticalNews::Headline).string_len(500).not_null())
                    .col(ColumnDef::new(PoliticalNews::SourceUrl).text())
                    .col(ColumnDef::new(PoliticalNews::Summary).text())
                    .col(ColumnDef::new(PoliticalNews::Category).string_len(30))
                    .col(ColumnDef::new(PoliticalNews::Subcategory).string_len(50))
                    .col(ColumnDef::new(PoliticalNews::CryptoRelevance).decimal_len(5, 4))
                    .col(ColumnDef::new(PoliticalNews::Sentiment).decimal_len(5, 4))
                    .col(ColumnDef::new(PoliticalNews::Urgency).decimal_len(5, 4))
                    .col(ColumnDef::new(PoliticalNews::Entities).json())
                    .col(ColumnDef::new(PoliticalNews::HeadlineGematria).json())
                    .col(ColumnDef::new(PoliticalNews::MentionVelocity).integer())
                    .primary_key(
                        Index::create()
                            .col(PoliticalNews::Timestamp)
                            .col(PoliticalNews::SourceName)
                            .col(PoliticalNews::HeadlineHash),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_polnews_relevance_time")
                    .table(PoliticalNews::Table)
                    .col(PoliticalNews::CryptoRelevance)
                    .col(PoliticalNews::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PoliticalSignal::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PoliticalSignal::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PoliticalSignal::CalendarScore).decimal_len(5, 4))
                    .col(ColumnDef::new(PoliticalSignal::NewsScore).decimal_len(5, 4))
                    .col(ColumnDef::new(PoliticalSignal::NarrativeScore).decimal_len(5, 4))
                    .col(
                        ColumnDef::new(PoliticalSignal::HighVolZone)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PoliticalSignal::BlackSwanOverride)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(PoliticalSignal::NewsVolume1h).integer())
                    .col(ColumnDef::new(PoliticalSignal::NewsVolume24h).integer())
                    .col(ColumnDef::new(PoliticalSignal::MaxUrgency1h).decimal_len(5, 4))
                    .col(ColumnDef::new(PoliticalSignal::DominantNarrative).string_len(80))
                    .col(ColumnDef::new(PoliticalSignal::NarrativeDirection).string_len(10))
                    .col(ColumnDef::new(PoliticalSignal::Score).decimal_len(5, 4))
                    .col(
                        ColumnDef::new(PoliticalSignal::Degraded)
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
            .drop_table(Table::drop().table(PoliticalSignal::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PoliticalNews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PoliticalCalendar::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PoliticalCalendar {
    Table,
    Id,
    EventDate,
    EventType,
    Category,
    Title,
    Description,
    Country,
    ExpectedVolatility,
    ExpectedDirection,
    CryptoRelevance,
    IsRecurring,
    RecurrenceRule,
    ActualImpactPct,
    OutcomeNotes,
}

#[derive(Iden)]
enum PoliticalNews {
    Table,
    Timestamp,
    SourceName,
    HeadlineHash,
    Headline,
    SourceUrl,
    Summary,
    Category,
    Subcategory,
    CryptoRelevance,
    Sentiment,
    Urgency,
    Entities,
    HeadlineGematria,
    MentionVelocity,
}

#[derive(Iden)]
enum PoliticalSignal {
    Table,
    Timestamp,
    CalendarScore,
    NewsScore,
    NarrativeScore,
    HighVolZone,
    BlackSwanOverride,
    NewsVolume1h,
    NewsVolume24h,
    MaxUrgency1h,
    DominantNarrative,
    NarrativeDirection,
    Score,
    Degraded,
}
