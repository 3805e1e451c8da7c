//! Celestial, numerology, and gematria endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{EntityTrait, QueryOrder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::entities::prelude::{CelestialState, NumerologyDaily};
use crate::entities::{celestial_state, numerology_daily};
use crate::models::common::ErrorResponse;
use crate::services::numerology::{
    date_digit_sum, gematria_all_ciphers, universal_day_number, is_master_number_date,
};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn db_error(e: sea_orm::DbErr) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("Database error: {e}"))),
    )
}

/// Handler for GET /api/celestial/current
pub async fn get_celestial_current(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let row = CelestialState::find()
        .order_by_desc(celestial_state::Column::Date)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("No celestial state computed yet")),
            )
        })?;
    Ok(Json(json!({ "date": row.date, "celestial": row })))
}

/// Handler for GET /api/numerology/current
pub async fn get_numerology_current(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let row = NumerologyDaily::find()
        .order_by_desc(numerology_daily::Column::Date)
        .one(&state.db)
        .await
        .map_err(db_error)?;

    match row {
        Some(row) => Ok(Json(json!({ "date": row.date, "numerology": row }))),
        // Not computed yet: answer from the pure calculator.
        None => {
            let today = Utc::now().date_naive();
            Ok(Json(json!({
                "date": today,
                "numerology": {
                    "date_digit_sum": date_digit_sum(today),
                    "universal_day_number": universal_day_number(today),
                    "is_master_number": is_master_number_date(today),
                },
            })))
        }
    }
}

/// Handler for GET /api/numerology/{date}
pub async fn get_numerology_for_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!("Invalid date format: '{date}'"))),
        )
    })?;

    let row = NumerologyDaily::find_by_id(date)
        .one(&state.db)
        .await
        .map_err(db_error)?;

    match row {
        Some(row) => Ok(Json(json!({ "date": date, "numerology": row, "stored": true }))),
        None => Ok(Json(json!({
            "date": date,
            "stored": false,
            "numerology": {
                "date_digit_sum": date_digit_sum(date),
                "universal_day_number": universal_day_number(date),
                "is_master_number": is_master_number_date(date),
            },
        }))),
    }
}

#[derive(Debug, Deserialize)]
pub struct GematriaQuery {
    pub text: String,
}

/// Handler for GET /api/gematria/calculate
pub async fn calculate_gematria(
    Query(query): Query<GematriaQuery>,
) -> Result<Json<Value>, ApiError> {
    if query.text.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("text cannot be empty")),
        ));
    }
    let values = gematria_all_ciphers(&query.text);
    Ok(Json(json!({ "text": query.text, "values": values })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        Router::new().route("/api/gematria/calculate", get(calculate_gematria))
    }

    #[tokio::test]
    async fn test_calculate_gematria_returns_all_ciphers() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/gematria/calculate?text=bitcoin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["text"], "bitcoin");
        // b+i+t+c+o+i+n = 2+9+20+3+15+9+14.
        assert_eq!(json["values"]["english_ordinal"], 72);
        assert_eq!(json["values"]["english"], 432);
        assert!(json["values"]["jewish"].is_number());
        assert!(json["values"]["full_reduction"].is_number());
    }

    #[tokio::test]
    async fn test_calculate_gematria_rejects_empty_text() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/gematria/calculate?text=")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body_str = String::from_utf8(body.to_vec()).unwrap();
        assert!(body_str.contains("cannot be empty"));
    }

    #[tokio::test]
    async fn test_calculate_gematria_missing_param() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/gematria/calculate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
