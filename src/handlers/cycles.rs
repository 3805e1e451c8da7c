//! Custom cycle management endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::entities::{custom_cycles, prelude::CustomCycles};
use crate::models::common::ErrorResponse;
use crate::models::cycles::{CreateCycleRequest, CycleCheckResponse, CyclesResponse};
use crate::services::cycle_tracker;
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn db_error(e: sea_orm::DbErr) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("Database error: {e}"))),
    )
}

#[derive(Debug, Deserialize)]
pub struct CyclesQuery {
    pub include_inactive: Option<bool>,
}

/// Handler for GET /api/cycles
pub async fn list_cycles(
    State(state): State<AppState>,
    Query(query): Query<CyclesQuery>,
) -> Result<Json<CyclesResponse>, ApiError> {
    let mut find = CustomCycles::find();
    if !query.include_inactive.unwrap_or(false) {
        find = find.filter(custom_cycles::Column::IsActive.eq(true));
    }
    let rows = find.all(&state.db).await.map_err(db_error)?;
    Ok(Json(CyclesResponse {
        count: rows.len(),
        cycles: rows,
    }))
}

/// Handler for POST /api/cycles
pub async fn create_cycle(
    State(state): State<AppState>,
    Json(body): Json<CreateCycleRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Err(e) = body.validate() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse::new(e))));
    }

    // A second active cycle with the same name and period is a collision.
    let existing = CustomCycles::find()
        .filter(custom_cycles::Column::Name.eq(body.name.clone()))
        .filter(custom_cycles::Column::IsActive.eq(true))
        .one(&state.db)
        .await
        .map_err(db_error)?;
    if existing.is_some() {
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(format!(
                "An active cycle named '{}' already exists",
                body.name
            ))),
        ));
    }

    let row = custom_cycles::ActiveModel {
        name: Set(body.name.clone()),
        period_days: Set(body.period_days),
        anchor_date: Set(body.anchor_date),
        reference_event: Set(body.reference_event.clone()),
        tolerance_days: Set(body.tolerance_days.unwrap_or(2)),
        direction: Set(body.direction.clone().unwrap_or_else(|| "bearish".to_string())),
        is_active: Set(true),
        hit_count: Set(0),
        miss_count: Set(0),
        notes: Set(body.notes.clone()),
        ..Default::default()
    };
    let inserted = row.insert(&state.db).await.map_err(db_error)?;

    tracing::info!(name = inserted.name, period = inserted.period_days, "Cycle created");
    Ok((StatusCode::CREATED, Json(json!({ "cycle": inserted }))))
}

/// Handler for GET /api/cycles/{id}/status
pub async fn cycle_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let cycle = CustomCycles::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!("Cycle {id} not found"))),
            )
        })?;

    let today = Utc::now().date_naive();
    let status = cycle_tracker::check_cycle(&cycle, today);
    Ok(Json(json!({ "cycle": cycle, "today": today, "status": status })))
}

/// Handler for GET /api/cycles/check/{date}
pub async fn check_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<CycleCheckResponse>, ApiError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!("Invalid date format: '{date}'"))),
        )
    })?;

    let statuses = cycle_tracker::all_statuses(&state.db, date)
        .await
        .map_err(db_error)?;
    let aligned_count = statuses.iter().filter(|s| s.is_aligned).count();
    Ok(Json(CycleCheckResponse {
        date,
        aligned_count,
        cycles: statuses,
    }))
}
