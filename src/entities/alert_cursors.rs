//! Last-observed composite per (symbol, timeframe), so threshold
//! edge-triggering survives scheduler restarts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alert_cursors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub symbol: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub timeframe: String,
    pub last_triggered_at: DateTimeUtc,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub last_composite: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
