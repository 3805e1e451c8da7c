use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub created_at: Option<DateTimeUtc>,
    pub triggered_at: DateTimeUtc,
    pub symbol: String,
    pub kind: String,
    pub severity: String,
    pub title: String,
    pub description: Option<String>,
    pub trigger_context: Option<Json>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))", nullable)]
    pub composite_score: Option<Decimal>,
    /// Idempotency window bucket (floored trigger instant or event id).
    pub window_bucket: String,
    pub entity_id: Option<String>,
    /// active | acknowledged | dismissed
    pub status: String,
    pub acknowledged_at: Option<DateTimeUtc>,
    pub dismissed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
