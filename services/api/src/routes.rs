use crate::infra::{AppState, Matching, Sessions, TrustEngine};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use mentorme::workflows::matching::matching_router;
use mentorme::workflows::sessions::session_router;
use mentorme::workflows::trust::trust_router;
use serde_json::json;
use std::sync::Arc;

/// Every workflow router plus the operational endpoints.
pub(crate) fn with_application_routes(
    sessions: Arc<Sessions>,
    trust: Arc<TrustEngine>,
    matching: Arc<Matching>,
) -> axum::Router {
    session_router(sessions)
        .merge(trust_router(trust))
        .merge(matching_router(matching))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };

    (status, Json(json!({ "status": label })))
}

pub(crate) async fn metrics_endpoint(
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{
        seed_catalog, InMemoryStore, LoggingNotificationSink, SEED_SESSION, SEED_STUDENT_USER,
        SEED_TUTOR, SEED_TUTOR_USER,
    };
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use mentorme::clock::ManualClock;
    use mentorme::config::MatchingConfig;
    use mentorme::workflows::matching::{MatchingEngine, MatchingService};
    use mentorme::workflows::sessions::{SessionConfirmationService, ACTOR_HEADER};
    use mentorme::workflows::trust::TrustScoreEngine;
    use serde_json::Value;
    use tower::ServiceExt;

    struct Harness {
        router: axum::Router,
        clock: Arc<ManualClock>,
        notifications: LoggingNotificationSink,
    }

    fn harness() -> Harness {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
        let store = Arc::new(InMemoryStore::default());
        let opens = Utc.with_ymd_and_hms(2025, 3, 10, 13, 50, 0).unwrap();
        let clock = Arc::new(ManualClock::new(opens));
        let trust = Arc::new(TrustScoreEngine::new(store.clone(), clock.clone()));
        seed_catalog(&store, &trust, start).expect("seed");
        let notifications = LoggingNotificationSink::default();

        let sessions = Arc::new(SessionConfirmationService::new(
            store.clone(),
            store.clone(),
            Arc::new(notifications.clone()),
            trust.clone(),
            clock.clone(),
        ));
        let matching = Arc::new(MatchingService::new(
            store,
            MatchingEngine::default(),
            MatchingConfig::default(),
        ));

        Harness {
            router: with_application_routes(sessions, trust, matching),
            clock,
            notifications,
        }
    }

    fn request(
        method: &str,
        uri: &str,
        actor: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header(ACTOR_HEADER, actor);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request")
    }

    async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, serde_json::from_slice(&bytes).expect("json"))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn session_lifecycle_updates_trust_score() {
        let Harness {
            router,
            clock,
            notifications,
        } = harness();
        let start_uri = format!("/api/v1/sessions/{SEED_SESSION}/start");
        let complete_uri = format!("/api/v1/sessions/{SEED_SESSION}/complete");

        for actor in [SEED_TUTOR_USER, SEED_STUDENT_USER] {
            let (status, _) = send(&router, request("PATCH", &start_uri, Some(actor), None)).await;
            assert_eq!(status, StatusCode::OK);
        }

        clock.set(Utc.with_ymd_and_hms(2025, 3, 10, 16, 10, 0).unwrap());
        let mut last = Value::Null;
        for actor in [SEED_TUTOR_USER, SEED_STUDENT_USER] {
            let (status, body) =
                send(&router, request("PATCH", &complete_uri, Some(actor), None)).await;
            assert_eq!(status, StatusCode::OK);
            last = body;
        }
        assert_eq!(last["status"], "COMPLETED");

        let trust_uri = format!("/api/v1/tutors/{SEED_TUTOR}/trust-score");
        let (status, stats) = send(&router, request("GET", &trust_uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["trust_score"], 51.0);
        assert_eq!(stats["total_cancelled_bookings"], 1);

        let codes: Vec<_> = notifications
            .events()
            .iter()
            .map(|event| event.kind.code())
            .collect();
        assert!(codes.contains(&"SESSION_STARTED"));
        assert!(codes.contains(&"SESSION_COMPLETED"));
    }

    #[tokio::test]
    async fn matching_route_ranks_seeded_tutors() {
        let Harness { router, .. } = harness();

        let (status, body) = send(
            &router,
            request(
                "POST",
                "/api/v1/matching/tutors",
                None,
                Some(json!({
                    "subject_id": "math",
                    "grade_level": "grade 10",
                    "budget_per_hour": 150.0,
                    "limit": 2
                })),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let ranked = body.as_array().expect("array");
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0]["tutor"]["id"], "tutor-quang");
        assert!(ranked[0]["match_score"].as_f64() >= ranked[1]["match_score"].as_f64());
    }

    #[tokio::test]
    async fn start_without_actor_is_unauthorized() {
        let Harness { router, .. } = harness();
        let uri = format!("/api/v1/sessions/{SEED_SESSION}/start");

        let (status, body) = send(&router, request("PATCH", &uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().expect("message").contains(ACTOR_HEADER));
    }
}
