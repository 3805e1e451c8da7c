use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "numerology_daily")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: Date,
    pub date_digit_sum: Option<i32>,
    pub universal_day_number: Option<i32>,
    pub is_master_number: bool,
    pub master_number_value: Option<i32>,
    /// Cycle alignments active on this date, as reported by the tracker.
    pub active_cycles: Option<Json>,
    pub cycle_confluence_count: i32,
    pub close_digit_match: Option<bool>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub score: Option<Decimal>,
    pub degraded: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
