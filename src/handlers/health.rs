use axum::{extract::State, http::StatusCode, Json};
use sea_orm::{ConnectionTrait, Statement};
use serde_json::{json, Value};

use crate::AppState;

pub async fn root() -> &'static str {
    "confluence-backend"
}

/// Liveness plus the per-job health gauges (last success/failure, streak).
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = state
        .db
        .execute(Statement::from_string(
            state.db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();

    let jobs: Value = state
        .health
        .read()
        .iter()
        .map(|(name, h)| (name.to_string(), serde_json::to_value(h).unwrap_or(Value::Null)))
        .collect::<serde_json::Map<String, Value>>()
        .into();

    let status = if db_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(json!({
            "status": if db_ok { "ok" } else { "degraded" },
            "database": db_ok,
            "jobs": jobs,
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode as HttpStatus},
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_banner() {
        let app = Router::new().route("/", get(root));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), HttpStatus::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"confluence-backend");
    }
}
