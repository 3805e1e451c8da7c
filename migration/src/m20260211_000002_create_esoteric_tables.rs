use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per civil day.
        manager
            .create_table(
                Table::create()
                    .table(CelestialState::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CelestialState::Date).date().not_null().primary_key())
                    .col(ColumnDef::new(CelestialState::LunarPhaseAngle).decimal_len(10, 4))
                    .col(ColumnDef::new(CelestialState::LunarPhaseName).string_len(20))
                    .col(ColumnDef::new(CelestialState::LunarIllumination).decimal_len(5, 4))
                    .col(
                        ColumnDef::new(CelestialState::IsLunarEclipse)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CelestialState::IsSolarEclipse)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CelestialState::MercuryRetrograde)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CelestialState::VenusRetrograde)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CelestialState::MarsRetrograde)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CelestialState::JupiterRetrograde)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CelestialState::SaturnRetrograde)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CelestialState::RetrogradeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CelestialState::SunLongitude).decimal_len(10, 4))
                    .col(ColumnDef::new(CelestialState::MoonLongitude).decimal_len(10, 4))
                    .col(ColumnDef::new(CelestialState::MercuryLongitude).decimal_len(10, 4))
                    .col(ColumnDef::new(CelestialState::VenusLongitude).decimal_len(10, 4))
                    .col(ColumnDef::new(CelestialState::MarsLongitude).decimal_len(10, 4))
                    .col(ColumnDef::new(CelestialState::JupiterLongitude).decimal_len(10, 4))
                    .col(ColumnDef::new(CelestialState::SaturnLongitude).decimal_len(10, 4))
                    .col(ColumnDef::new(CelestialState::ActiveAspects).json())
                    .col(ColumnDef::new(CelestialState::Ingresses).json())
                    .col(ColumnDef::new(CelestialState::Score).decimal_len(5, 4))
                    .col(
                        ColumnDef::new(CelestialState::Degraded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NumerologyDaily::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(NumerologyDaily::Date).date().not_null().primary_key())
                    .col(ColumnDef::new(NumerologyDaily::DateDigitSum).integer())
                    .col(ColumnDef::new(NumerologyDaily::UniversalDayNumber).integer())
                    .col(
                        ColumnDef::new(NumerologyDaily::IsMasterNumber)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(NumerologyDaily::MasterNumberValue).integer())
                    .col(ColumnDef::new(NumerologyDaily::ActiveCycles).json())
                    .col(
                        ColumnDef::new(NumerologyDaily::CycleConfluenceCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(NumerologyDaily::CloseDigitMatch).boolean())
                    .col(ColumnDef::new(NumerologyDaily::Score).decimal_len(5, 4))
                    .col(
                        ColumnDef::new(NumerologyDaily::Degraded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomCycles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomCycles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CustomCycles::Name).string_len(100).not_null())
                    .col(ColumnDef::new(CustomCycles::PeriodDays).integer().not_null())
                    .col(ColumnDef::new(CustomCycles::AnchorDate).date().not_null())
                    .col(ColumnDef::new(CustomCycles::ReferenceEvent).text())
                    .col(
                        ColumnDef::new(CustomCycles::ToleranceDays)
                            .integer()
                            .not_null()
                            .default(2),
                    )
                    .col(
                        ColumnDef::new(CustomCycles::Direction)
                            .string_len(10)
                            .not_null()
                            .default("bearish"),
                    )
                    .col(
                        ColumnDef::new(CustomCycles::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(CustomCycles::HitCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CustomCycles::MissCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CustomCycles::HitRate).decimal_len(5, 4))
                    .col(ColumnDef::new(CustomCycles::Notes).text())
                    .col(
                        ColumnDef::new(CustomCycles::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomCycles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NumerologyDaily::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CelestialState::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CelestialState {
    Table,
    Date,
    LunarPhaseAngle,
    LunarPhaseName,
    LunarIllumination,
    IsLunarEclipse,
    IsSolarEclipse,
    MercuryRetrograde,
    VenusRetrograde,
    MarsRetrograde,
    JupiterRetrograde,
    SaturnRetrograde,
    RetrogradeCount,
    SunLongitude,
    MoonLongitude,
    MercuryLongitude,
    VenusLongitude,
    MarsLongitude,
    JupiterLongitude,
    SaturnLongitude,
    ActiveAspects,
    Ingresses,
    Score,
    Degraded,
}

#[derive(Iden)]
enum NumerologyDaily {
    Table,
    Date,
    DateDigitSum,
    UniversalDayNumber,
    IsMasterNumber,
    MasterNumberValue,
    ActiveCycles,
    CycleConfluenceCount,
    CloseDigitMatch,
    Score,
    Degraded,
}

#[derive(Iden)]
enum CustomCycles {
    Table,
    Id,
    Name,
    PeriodDays,
    AnchorDate,
    ReferenceEvent,
    ToleranceDays,
    Direction,
    IsActive,
    HitCount,
    MissCount,
    HitRate,
    Notes,
    CreatedAt,
}
