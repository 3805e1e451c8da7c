//! Generic keyed macro time series (WTI, DXY, yields, M2, USD/JPY, VIX, ...).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "macro_series")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeUtc,
    #[sea_orm(primary_key, auto_increment = false)]
    pub series_key: String,
    #[sea_orm(column_type = "Decimal(Some((20, 8)))")]
    pub value: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
