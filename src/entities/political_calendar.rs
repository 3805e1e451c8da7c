use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "political_calendar")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub event_date: Date,
    pub event_type: String,
    pub category: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub country: Option<String>,
    /// low | medium | high | extreme
    pub expected_volatility: String,
    /// Expected market direction in [-1, +1]; None when unknown.
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub expected_direction: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub crypto_relevance: Option<Decimal>,
    pub is_recurring: bool,
    pub recurrence_rule: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub actual_impact_pct: Option<Decimal>,
    pub outcome_notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
