//! Backtest endpoints: run cycle/signal backtests and fetch stored reports.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::models::backtest::{CycleBacktestRequest, SignalBacktestRequest};
use crate::models::common::ErrorResponse;
use crate::models::domain::Timeframe;
use crate::services::config::normalize_symbol;
use crate::services::{backtester, confluence_engine};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn db_error(e: sea_orm::DbErr) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("Database error: {e}"))),
    )
}

/// Handler for POST /api/backtest/cycle
pub async fn run_cycle_backtest(
    State(state): State<AppState>,
    Json(body): Json<CycleBacktestRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Err(e) = body.validate() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse::new(e))));
    }
    let symbol = normalize_symbol(body.symbol.as_deref().unwrap_or("BTC/USDT"));

    let report = backtester::run_cycle_backtest(
        &state.db,
        &symbol,
        body.start,
        body.end,
        body.period_days,
        body.tolerance_days.unwrap_or(2),
        body.min_drop_pct.unwrap_or(backtester::DEFAULT_DRAWDOWN_PCT),
    )
    .await
    .map_err(db_error)?;

    if report.event_count == 0 {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(
                "No drawdown events in the requested range (is the daily history ingested?)",
            )),
        ));
    }

    let id = backtester::store_report(
        &state.db,
        "cycle",
        serde_json::to_value(&body).unwrap_or_default(),
        serde_json::to_value(&report).unwrap_or_default(),
    )
    .await
    .map_err(db_error)?;

    Ok(Json(json!({ "id": id, "report": report })))
}

/// Handler for POST /api/backtest/signals
pub async fn run_signal_backtest(
    State(state): State<AppState>,
    Json(body): Json<SignalBacktestRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Err(e) = body.validate() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse::new(e))));
    }
    let symbol = normalize_symbol(body.symbol.as_deref().unwrap_or("BTC/USDT"));
    let timeframe = body
        .timeframe
        .as_deref()
        .and_then(Timeframe::parse)
        .unwrap_or(Timeframe::D1);

    let weights = confluence_engine::get_active_weights(&state.db)
        .await
        .map_err(db_error)?;

    let start = body.start.and_hms_opt(0, 0, 0).unwrap().and_utc();
    let end = body.end.and_hms_opt(23, 59, 59).unwrap().and_utc();
    let ticks = backtester::replay_range(&state.db, &symbol, timeframe, start, end, &weights)
        .await
        .map_err(db_error)?;

    if ticks.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(
                "No candles in the requested range (is the history ingested?)",
            )),
        ));
    }

    let report = backtester::simulate_trades(&ticks, body.threshold());
    let mut payload = backtester::signal_report_json(&report, &weights);

    if body.optimize_weights.unwrap_or(false) {
        let top = backtester::optimize_weights(
            &ticks,
            body.threshold(),
            body.granularity.unwrap_or(0.1),
            body.top_k.unwrap_or(5),
        );
        payload["optimization"] = serde_json::to_value(&top).unwrap_or_default();
    }

    let id = backtester::store_report(
        &state.db,
        "signals",
        serde_json::to_value(&body).unwrap_or_default(),
        payload.clone(),
    )
    .await
    .map_err(db_error)?;

    Ok(Json(json!({ "id": id, "result": payload })))
}

/// Handler for GET /api/backtest/results/{id}
pub async fn get_backtest_result(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let row = backtester::load_report(&state.db, id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!("Backtest result {id} not found"))),
            )
        })?;
    Ok(Json(json!({
        "id": row.id,
        "kind": row.kind,
        "params": row.params,
        "report": row.report,
        "created_at": row.created_at,
    })))
}
