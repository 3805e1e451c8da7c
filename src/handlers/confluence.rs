//! Confluence endpoints: latest composite, history, and the weight profile.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::{json, Value};

use crate::entities::prelude::{ConfluenceScores, SignalWeights};
use crate::entities::{confluence_scores, signal_weights};
use crate::models::common::ErrorResponse;
use crate::models::confluence::{ConfluenceQuery, HistoryQuery, WeightUpdateRequest, WeightsResponse};
use crate::models::domain::Timeframe;
use crate::services::config::normalize_symbol;
use crate::services::confluence_engine;
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn db_error(e: sea_orm::DbErr) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("Database error: {e}"))),
    )
}

fn parse_timeframe(tf: Option<&str>) -> Result<Timeframe, ApiError> {
    match tf {
        None => Ok(Timeframe::H1),
        Some(tf) => Timeframe::parse(tf).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!("Unknown timeframe '{tf}'"))),
            )
        }),
    }
}

/// Handler for GET /api/confluence/weights
pub async fn get_weights(State(state): State<AppState>) -> Result<Json<WeightsResponse>, ApiError> {
    let weights = confluence_engine::get_active_weights(&state.db)
        .await
        .map_err(db_error)?;
    Ok(Json(WeightsResponse {
        profile: "active".to_string(),
        weights,
    }))
}

/// Handler for POST /api/confluence/weights. The new profile takes effect on
/// the next tick; historical composites keep their snapshotted weights.
pub async fn update_weights(
    State(state): State<AppState>,
    Json(body): Json<WeightUpdateRequest>,
) -> Result<Json<WeightsResponse>, ApiError> {
    if let Err(e) = body.validate() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(e)),
        ));
    }

    // Deactivate current profiles, then insert the new active one.
    SignalWeights::update_many()
        .col_expr(signal_weights::Column::IsActive, sea_orm::sea_query::Expr::value(false))
        .filter(signal_weights::Column::IsActive.eq(true))
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    let dec = |v: f64| Decimal::from_f64(v).unwrap_or_default();
    let profile = signal_weights::ActiveModel {
        profile_name: Set(body
            .profile_name
            .clone()
            .unwrap_or_else(|| "custom".to_string())),
        ta_weight: Set(dec(body.ta)),
        onchain_weight: Set(dec(body.onchain)),
        celestial_weight: Set(dec(body.celestial)),
        numerology_weight: Set(dec(body.numerology)),
        sentiment_weight: Set(dec(body.sentiment)),
        political_weight: Set(dec(body.political)),
        macro_weight: Set(dec(body.macro_)),
        is_active: Set(true),
        ..Default::default()
    };
    profile.insert(&state.db).await.map_err(db_error)?;

    tracing::info!("Weight profile updated");
    Ok(Json(WeightsResponse {
        profile: "active".to_string(),
        weights: body.to_weights(),
    }))
}

/// Handler for GET /api/confluence/{symbol}
pub async fn get_confluence(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ConfluenceQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    let timeframe = parse_timeframe(query.timeframe.as_deref())?;

    let row = ConfluenceScores::find()
        .filter(confluence_scores::Column::Symbol.eq(&symbol))
        .filter(confluence_scores::Column::Timeframe.eq(timeframe.as_str()))
        .order_by_desc(confluence_scores::Column::Timestamp)
        .one(&state.db)
        .await
        .map_err(db_error)?;

    // Compute on the fly when the scheduler has not produced one yet.
    let row = match row {
        Some(row) => row,
        None => {
            confluence_engine::compute_and_store(&state.db, &symbol, timeframe, Utc::now())
                .await
                .map_err(db_error)?;
            ConfluenceScores::find()
                .filter(confluence_scores::Column::Symbol.eq(&symbol))
                .filter(confluence_scores::Column::Timeframe.eq(timeframe.as_str()))
                .order_by_desc(confluence_scores::Column::Timestamp)
                .one(&state.db)
                .await
                .map_err(db_error)?
                .ok_or_else(|| {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(ErrorResponse::new("Confluence could not be computed")),
                    )
                })?
        }
    };

    Ok(Json(json!({
        "symbol": symbol,
        "timeframe": timeframe.as_str(),
        "composite": row,
    })))
}

/// Handler for GET /api/confluence/{symbol}/history
pub async fn get_confluence_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    let timeframe = parse_timeframe(query.timeframe.as_deref())?;
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);

    let rows = ConfluenceScores::find()
        .filter(confluence_scores::Column::Symbol.eq(&symbol))
        .filter(confluence_scores::Column::Timeframe.eq(timeframe.as_str()))
        .order_by_desc(confluence_scores::Column::Timestamp)
        .limit(limit)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(json!({
        "symbol": symbol,
        "timeframe": timeframe.as_str(),
        "count": rows.len(),
        "data": rows,
    })))
}
