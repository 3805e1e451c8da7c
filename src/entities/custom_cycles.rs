use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "custom_cycles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub period_days: i32,
    pub anchor_date: Date,
    pub reference_event: Option<String>,
    pub tolerance_days: i32,
    /// "bullish" or "bearish" — sign of the cycle's contribution when aligned.
    pub direction: String,
    pub is_active: bool,
    pub hit_count: i32,
    pub miss_count: i32,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub hit_rate: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
