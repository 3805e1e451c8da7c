use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "macro_signal")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeUtc,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub liquidity_score: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub treasury_score: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub dollar_score: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub oil_score: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub carry_trade_score: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub carry_stress: Option<Decimal>,
    pub regime: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub regime_confidence: Option<Decimal>,
    pub sub_signals: Option<Json>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub score: Option<Decimal>,
    pub degraded: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
