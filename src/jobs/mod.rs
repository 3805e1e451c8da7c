pub mod alert_checks;
pub mod confluence_sync;
pub mod esoteric_daily;
pub mod market_data;
pub mod macro_jobs;
pub mod onchain_sync;
pub mod political;
pub mod sentiment_sync;

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use crate::entities::{prelude::WatchedSymbols, watched_symbols};
use crate::models::domain::Timeframe;

/// The active (symbol, timeframes) universe. Falls back to BTC/USDT on the
/// standard timeframes when nothing is configured yet.
pub async fn active_universe(
    db: &DatabaseConnection,
) -> Result<Vec<(String, Vec<Timeframe>)>, DbErr> {
    let rows = WatchedSymbols::find()
        .filter(watched_symbols::Column::IsActive.eq(true))
        .all(db)
        .await?;

    if rows.is_empty() {
        return Ok(vec![(
            "BTC/USDT".to_string(),
            vec![Timeframe::H1, Timeframe::H4, Timeframe::D1],
        )]);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let timeframes: Vec<Timeframe> = row
                .timeframes
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().and_then(Timeframe::parse))
                        .collect()
                })
                .unwrap_or_default();
            let timeframes = if timeframes.is_empty() {
                vec![Timeframe::H1, Timeframe::H4, Timeframe::D1]
            } else {
                timeframes
            };
            (row.symbol, timeframes)
        })
        .collect())
}
