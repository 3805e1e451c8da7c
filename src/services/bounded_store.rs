//! Time-bounded query helpers.
//!
//! Every producer input read and the backtest walker funnel through these
//! functions, so the no-lookahead cutoff (`column <= at`) lives in one place
//! instead of being repeated per call site. A row stamped exactly at the
//! scoring instant is the bar that closed at that instant and is admissible;
//! rows after the instant are never returned.

use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Select,
};

/// Newest row whose `col` is at or before `cutoff`.
pub async fn newest_at_or_before<E, C, V>(
    db: &DatabaseConnection,
    select: Select<E>,
    col: C,
    cutoff: V,
) -> Result<Option<E::Model>, DbErr>
where
    E: EntityTrait,
    C: ColumnTrait + Copy,
    V: Into<sea_orm::Value>,
{
    select
        .filter(col.lte(cutoff))
        .order_by_desc(col)
        .one(db)
        .await
}

/// Up to `limit` rows at or before `cutoff`, newest first.
pub async fn recent_at_or_before<E, C, V>(
    db: &DatabaseConnection,
    select: Select<E>,
    col: C,
    cutoff: V,
    limit: u64,
) -> Result<Vec<E::Model>, DbErr>
where
    E: EntityTrait,
    C: ColumnTrait + Copy,
    V: Into<sea_orm::Value>,
{
    select
        .filter(col.lte(cutoff))
        .order_by_desc(col)
        .limit(limit)
        .all(db)
        .await
}

/// All rows with `col` in the half-open window (`after`, `until`].
pub async fn window_ending_at<E, C, V>(
    db: &DatabaseConnection,
    select: Select<E>,
    col: C,
    after: V,
    until: V,
) -> Result<Vec<E::Model>, DbErr>
where
    E: EntityTrait,
    C: ColumnTrait + Copy,
    V: Into<sea_orm::Value>,
{
    select
        .filter(col.gt(after))
        .filter(col.lte(until))
        .all(db)
        .await
}
