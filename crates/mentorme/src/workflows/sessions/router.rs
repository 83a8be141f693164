use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Router,
};
use serde_json::json;

use super::domain::{SessionId, SessionView};
use super::repository::{ClassDirectory, NotificationSink, SessionRepository};
use super::service::{SessionConfirmationService, SessionServiceError};
use crate::workflows::domain::{RepositoryError, UserId};

/// Header carrying the authenticated caller, populated by the auth layer in front of the API.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Router exposing session confirmation endpoints.
pub fn session_router<R, D, N>(service: Arc<SessionConfirmationService<R, D, N>>) -> Router
where
    R: SessionRepository + 'static,
    D: ClassDirectory + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route("/api/v1/sessions/:session_id", get(view_handler::<R, D, N>))
        .route(
            "/api/v1/sessions/:session_id/start",
            patch(start_handler::<R, D, N>),
        )
        .route(
            "/api/v1/sessions/:session_id/complete",
            patch(complete_handler::<R, D, N>),
        )
        .with_state(service)
}

pub(crate) async fn view_handler<R, D, N>(
    State(service): State<Arc<SessionConfirmationService<R, D, N>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    D: ClassDirectory + 'static,
    N: NotificationSink + 'static,
{
    respond(service.get(&SessionId(session_id)))
}

pub(crate) async fn start_handler<R, D, N>(
    State(service): State<Arc<SessionConfirmationService<R, D, N>>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: SessionRepository + 'static,
    D: ClassDirectory + 'static,
    N: NotificationSink + 'static,
{
    let Some(actor) = actor_from(&headers) else {
        return missing_actor();
    };
    respond(service.start(&SessionId(session_id), &actor))
}

pub(crate) async fn complete_handler<R, D, N>(
    State(service): State<Arc<SessionConfirmationService<R, D, N>>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: SessionRepository + 'static,
    D: ClassDirectory + 'static,
    N: NotificationSink + 'static,
{
    let Some(actor) = actor_from(&headers) else {
        return missing_actor();
    };
    respond(service.complete(&SessionId(session_id), &actor))
}

fn actor_from(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
}

fn missing_actor() -> Response {
    let payload = json!({ "error": format!("missing {ACTOR_HEADER} header") });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

fn respond(result: Result<SessionView, SessionServiceError>) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => {
            let status = status_for(&error);
            let payload = json!({ "error": error.to_string() });
            (status, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) fn status_for(error: &SessionServiceError) -> StatusCode {
    match error {
        SessionServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionServiceError::Forbidden | SessionServiceError::Unverified => StatusCode::FORBIDDEN,
        SessionServiceError::OutsideWindow { .. } | SessionServiceError::TooEarly { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SessionServiceError::TerminalState(_)
        | SessionServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        SessionServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        SessionServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
