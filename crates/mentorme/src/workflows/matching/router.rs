use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use super::domain::{MatchCandidate, TutorCandidate};
use super::scoring::ScoreBreakdown;
use super::service::{
    CandidateSupplier, MatchingError, MatchingRequest, MatchingService, TutorSearchFilter,
};
use crate::workflows::domain::{TutorId, UserId};

const MASKED_NATIONAL_ID: &str = "******";

/// Public tutor card; identity documents are masked and offerings are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TutorProfileView {
    pub id: TutorId,
    pub user_id: UserId,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub national_id_number: Option<String>,
    pub trust_score: f64,
    pub average_rating: f64,
    pub total_completed_bookings: u64,
}

impl From<&TutorCandidate> for TutorProfileView {
    fn from(tutor: &TutorCandidate) -> Self {
        Self {
            id: tutor.tutor_id.clone(),
            user_id: tutor.user_id.clone(),
            bio: tutor.bio.clone(),
            city: tutor.city.clone(),
            district: tutor.district.clone(),
            national_id_number: tutor
                .national_id_number
                .as_ref()
                .map(|_| MASKED_NATIONAL_ID.to_string()),
            trust_score: tutor.trust_score,
            average_rating: tutor.average_rating,
            total_completed_bookings: tutor.total_completed_bookings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TutorMatchView {
    pub tutor: TutorProfileView,
    pub match_score: f64,
    pub breakdown: ScoreBreakdown,
}

impl From<&MatchCandidate> for TutorMatchView {
    fn from(candidate: &MatchCandidate) -> Self {
        Self {
            tutor: TutorProfileView::from(&candidate.tutor),
            match_score: candidate.match_score,
            breakdown: candidate.breakdown,
        }
    }
}

/// Router exposing budget matching and filter search.
pub fn matching_router<S>(service: Arc<MatchingService<S>>) -> Router
where
    S: CandidateSupplier + 'static,
{
    Router::new()
        .route("/api/v1/matching/tutors", post(match_handler::<S>))
        .route("/api/v1/tutors/search", post(search_handler::<S>))
        .with_state(service)
}

pub(crate) async fn match_handler<S>(
    State(service): State<Arc<MatchingService<S>>>,
    Json(request): Json<MatchingRequest>,
) -> Response
where
    S: CandidateSupplier + 'static,
{
    respond(service.match_tutors(&request))
}

pub(crate) async fn search_handler<S>(
    State(service): State<Arc<MatchingService<S>>>,
    Json(filter): Json<TutorSearchFilter>,
) -> Response
where
    S: CandidateSupplier + 'static,
{
    respond(service.search(&filter))
}

fn respond(result: Result<Vec<MatchCandidate>, MatchingError>) -> Response {
    match result {
        Ok(candidates) => {
            let views: Vec<TutorMatchView> = candidates.iter().map(TutorMatchView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => {
            let status = match error {
                MatchingError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
                MatchingError::Supplier(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": error.to_string() }))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingConfig;
    use crate::workflows::domain::ClassId;
    use crate::workflows::matching::domain::{ClassOffering, OfferingStatus};
    use crate::workflows::matching::engine::MatchingEngine;
    use crate::workflows::matching::service::StaticCandidates;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn router() -> Router {
        let tutor = TutorCandidate {
            tutor_id: TutorId("tutor-9".to_string()),
            user_id: UserId("user-9".to_string()),
            bio: Some("IELTS 8.5".to_string()),
            city: Some("Da Nang".to_string()),
            district: None,
            national_id_number: Some("048123456789".to_string()),
            trust_score: 70.0,
            average_rating: 4.2,
            total_completed_bookings: 12,
            offerings: vec![ClassOffering {
                class_id: ClassId("class-ielts".to_string()),
                subject_id: "english".to_string(),
                target_grade: Some("Grade 12".to_string()),
                price_per_hour: Some(250.0),
                status: OfferingStatus::Published,
            }],
        };
        let service = MatchingService::new(
            Arc::new(StaticCandidates::new(vec![tutor])),
            MatchingEngine::default(),
            MatchingConfig::default(),
        );
        matching_router(Arc::new(service))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn match_route_masks_identity_documents() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/matching/tutors",
                json!({
                    "subject_id": "english",
                    "grade_level": "grade 12",
                    "budget_per_hour": 200.0
                }),
            ))
            .await
            .expect("route response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let first = &body[0];
        assert_eq!(first["tutor"]["id"], "tutor-9");
        assert_eq!(first["tutor"]["national_id_number"], MASKED_NATIONAL_ID);
        assert!(first["tutor"].get("offerings").is_none());
        assert_eq!(first["breakdown"]["price_penalty"], 10.0);
        assert_eq!(first["breakdown"]["subject_match"], true);
    }

    #[tokio::test]
    async fn match_route_rejects_non_positive_budget() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/matching/tutors",
                json!({
                    "subject_id": "english",
                    "grade_level": "grade 12",
                    "budget_per_hour": -5.0
                }),
            ))
            .await
            .expect("route response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["error"]
            .as_str()
            .expect("message")
            .contains("budget_per_hour"));
    }

    #[tokio::test]
    async fn search_route_accepts_an_empty_filter() {
        let response = router()
            .oneshot(post_json("/api/v1/tutors/search", json!({})))
            .await
            .expect("route response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["breakdown"]["subject_match"], false);
    }
}
