//! Alert listing and status transitions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde_json::{json, Value};

use crate::entities::{alerts, prelude::Alerts};
use crate::models::alerts::{AlertsQuery, AlertsResponse};
use crate::models::common::ErrorResponse;
use crate::services::alert_engine;
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn db_error(e: sea_orm::DbErr) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("Database error: {e}"))),
    )
}

/// Handler for GET /api/alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsResponse>, ApiError> {
    if let Err(e) = query.validate() {
        return Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))));
    }

    let mut find = Alerts::find();
    if query.status() != "all" {
        find = find.filter(alerts::Column::Status.eq(query.status()));
    }
    if let Some(symbol) = &query.symbol {
        find = find.filter(alerts::Column::Symbol.eq(symbol.clone()));
    }

    let rows = find
        .order_by_desc(alerts::Column::TriggeredAt)
        .limit(query.limit())
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(AlertsResponse {
        count: rows.len(),
        alerts: rows,
    }))
}

/// Handler for POST /api/alerts/{id}/acknowledge
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let changed = alert_engine::acknowledge(&state.db, id)
        .await
        .map_err(db_error)?;
    if !changed {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("No active alert with that id")),
        ));
    }
    Ok(Json(json!({ "id": id, "status": "acknowledged" })))
}

/// Handler for POST /api/alerts/{id}/dismiss
pub async fn dismiss_alert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let changed = alert_engine::dismiss(&state.db, id)
        .await
        .map_err(db_error)?;
    if !changed {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("No active alert with that id")),
        ));
    }
    Ok(Json(json!({ "id": id, "status": "dismissed" })))
}
