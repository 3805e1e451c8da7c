//! Latest-row endpoints for the per-layer signals.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde_json::{json, Value};

use crate::entities::prelude::{MacroSignal, OnchainMetrics, PoliticalSignal, SentimentData, TaIndicators};
use crate::entities::{macro_signal, onchain_metrics, political_signal, sentiment_data, ta_indicators};
use crate::models::{common::ErrorResponse, confluence::ConfluenceQuery, domain::Timeframe};
use crate::services::config::normalize_symbol;
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn db_error(e: sea_orm::DbErr) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("Database error: {e}"))),
    )
}

fn not_found(what: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("{what} not found"))),
    )
}

/// Handler for GET /api/signals/ta/{symbol}
pub async fn get_ta(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ConfluenceQuery>,
) -> Result<Json<Value>, ApiError> {
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

    let row = TaIndicators::find()
        .filter(ta_indicators::Column::Symbol.eq(&symbol))
        .filter(ta_indicators::Column::Timeframe.eq(timeframe.as_str()))
        .order_by_desc(ta_indicators::Column::Timestamp)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("TA row"))?;

    if row.degraded {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("TA layer is degraded (stale inputs)")),
        ));
    }
    Ok(Json(json!({ "symbol": symbol, "timeframe": timeframe.as_str(), "indicators": row })))
}

/// Handler for GET /api/onchain/{symbol}
pub async fn get_onchain(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    let row = OnchainMetrics::find()
        .filter(onchain_metrics::Column::Symbol.eq(&symbol))
        .order_by_desc(onchain_metrics::Column::Timestamp)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("On-chain row"))?;
    Ok(Json(json!({ "symbol": symbol, "metrics": row })))
}

/// Handler for GET /api/sentiment/{symbol}
pub async fn get_sentiment(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    let row = SentimentData::find()
        .filter(sentiment_data::Column::Symbol.eq(&symbol))
        .order_by_desc(sentiment_data::Column::Timestamp)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Sentiment row"))?;
    Ok(Json(json!({ "symbol": symbol, "sentiment": row })))
}

/// Handler for GET /api/political/signal
pub async fn get_political(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let row = PoliticalSignal::find()
        .order_by_desc(political_signal::Column::Timestamp)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Political signal"))?;
    Ok(Json(json!({ "signal": row })))
}

/// Handler for GET /api/macro/signal
pub async fn get_macro(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let row = MacroSignal::find()
        .order_by_desc(macro_signal::Column::Timestamp)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Macro signal"))?;
    Ok(Json(json!({ "signal": row })))
}

/// Handler for GET /api/snapshot/{symbol} — the read-only view consumed by
/// the interpretation service.
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ConfluenceQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    let timeframe = query
        .timeframe
        .as_deref()
        .and_then(Timeframe::parse)
        .unwrap_or(Timeframe::H1);
    let snapshot = state
        .snapshot
        .snapshot(&state.db, &symbol, timeframe)
        .await
        .map_err(db_error)?;
    Ok(Json(snapshot))
}
