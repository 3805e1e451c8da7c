use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entities::{candles, prelude::Candles};
use crate::models::{
    common::ErrorResponse,
    domain::Timeframe,
    prices::{PricesQuery, PricesResponse},
};
use crate::services::config::normalize_symbol;
use crate::AppState;

/// Handler for GET /api/prices/{symbol}
pub async fn get_prices(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<PricesQuery>,
) -> Result<Json<PricesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let symbol = normalize_symbol(&symbol);
    let timeframe = match query.timeframe.as_deref() {
        None => Timeframe::H1,
        Some(tf) => Timeframe::parse(tf).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!("Unknown timeframe '{tf}'"))),
            )
        })?,
    };

    let rows = Candles::find()
        .filter(candles::Column::Symbol.eq(&symbol))
        .filter(candles::Column::Timeframe.eq(timeframe.as_str()))
        .order_by_desc(candles::Column::Timestamp)
        .limit(query.limit())
        .all(&state.db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("Database error: {e}"))),
            )
        })?;

    if rows.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!(
                "No candles stored for {symbol} {timeframe}"
            ))),
        ));
    }

    Ok(Json(PricesResponse {
        symbol,
        timeframe: timeframe.as_str().to_string(),
        count: rows.len(),
        data: rows,
    }))
}
