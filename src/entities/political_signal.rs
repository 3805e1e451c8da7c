use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "political_signal")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeUtc,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub calendar_score: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub news_score: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub narrative_score: Option<Decimal>,
    pub high_vol_zone: bool,
    pub black_swan_override: bool,
    pub news_volume_1h: Option<i32>,
    pub news_volume_24h: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub max_urgency_1h: Option<Decimal>,
    pub dominant_narrative: Option<String>,
    pub narrative_direction: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub score: Option<Decimal>,
    pub degraded: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
