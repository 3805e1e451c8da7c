//! SeaORM entity for classified news articles.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "political_news")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeUtc,
    #[sea_orm(primary_key, auto_increment = false)]
    pub source_name: String,
    /// Hex digest of the lowercased headline; dedup key across refetches.
    #[sea_orm(primary_key, auto_increment = false)]
    pub headline_hash: String,
    pub headline: String,
    pub source_url: Option<String>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub crypto_relevance: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub sentiment: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub urgency: Option<Decimal>,
    pub entities: Option<Json>,
    pub headline_gematria: Option<Json>,
    pub mention_velocity: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
