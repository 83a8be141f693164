use crate::cli::ServeArgs;
use crate::infra::{seed_catalog, AppState, InMemoryStore, LoggingNotificationSink};
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Duration, DurationRound, Utc};
use mentorme::clock::{Clock, SystemClock};
use mentorme::config::AppConfig;
use mentorme::error::AppError;
use mentorme::telemetry;
use mentorme::workflows::matching::{MatchingEngine, MatchingService};
use mentorme::workflows::sessions::SessionConfirmationService;
use mentorme::workflows::trust::TrustScoreEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryStore::default());
    let trust = Arc::new(TrustScoreEngine::new(store.clone(), clock.clone()));
    if !args.empty {
        // Sample class starts on the next full hour so its start window is reachable.
        match clock.now().duration_trunc(Duration::hours(1)) {
            Ok(hour) => {
                let first_session_at = hour + Duration::hours(1);
                seed_catalog(&store, &trust, first_session_at)?;
                info!(%first_session_at, "seeded in-memory catalog");
            }
            Err(error) => warn!(%error, "skipping catalog seed"),
        }
    }

    let sessions = Arc::new(SessionConfirmationService::new(
        store.clone(),
        store.clone(),
        Arc::new(LoggingNotificationSink::default()),
        trust.clone(),
        clock,
    ));
    let matching = Arc::new(MatchingService::new(
        store,
        MatchingEngine::default(),
        config.matching,
    ));

    let app = with_application_routes(sessions, trust, matching)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "mentorme api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
