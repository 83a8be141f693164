use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::repository::TutorStatsRepository;
use super::service::{TrustScoreEngine, TrustScoreError};
use crate::workflows::domain::TutorId;

/// Router exposing trust score reads and explicit recalculation.
pub fn trust_router<S>(engine: Arc<TrustScoreEngine<S>>) -> Router
where
    S: TutorStatsRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/tutors/:tutor_id/trust-score",
            get(trust_score_handler::<S>),
        )
        .route(
            "/api/v1/tutors/:tutor_id/trust-score/recalculate",
            post(recalculate_handler::<S>),
        )
        .with_state(engine)
}

pub(crate) async fn trust_score_handler<S>(
    State(engine): State<Arc<TrustScoreEngine<S>>>,
    Path(tutor_id): Path<String>,
) -> Response
where
    S: TutorStatsRepository + 'static,
{
    match engine.tutor_stats(&TutorId(tutor_id)) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn recalculate_handler<S>(
    State(engine): State<Arc<TrustScoreEngine<S>>>,
    Path(tutor_id): Path<String>,
) -> Response
where
    S: TutorStatsRepository + 'static,
{
    match engine.recalculate(&TutorId(tutor_id)) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: TrustScoreError) -> Response {
    let status = match error {
        TrustScoreError::TutorNotFound(_) => StatusCode::NOT_FOUND,
        TrustScoreError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
