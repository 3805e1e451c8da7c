use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "signal_weights")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub profile_name: String,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub ta_weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub onchain_weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub celestial_weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub numerology_weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub sentiment_weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub political_weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub macro_weight: Decimal,
    pub is_active: bool,
    pub created_at: Option<DateTimeUtc>,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
