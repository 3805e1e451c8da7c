//! SeaORM entity for the daily celestial state. One row per civil day.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "celestial_state")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: Date,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub lunar_phase_angle: Option<Decimal>,
    pub lunar_phase_name: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub lunar_illumination: Option<Decimal>,
    pub is_lunar_eclipse: bool,
    pub is_solar_eclipse: bool,
    pub mercury_retrograde: bool,
    pub venus_retrograde: bool,
    pub mars_retrograde: bool,
    pub jupiter_retrograde: bool,
    pub saturn_retrograde: bool,
    pub retrograde_count: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub sun_longitude: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub moon_longitude: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub mercury_longitude: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub venus_longitude: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub mars_longitude: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub jupiter_longitude: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub saturn_longitude: Option<Decimal>,
    pub active_aspects: Option<Json>,
    pub ingresses: Option<Json>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub score: Option<Decimal>,
    pub degraded: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
