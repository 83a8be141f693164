use crate::infra::{
    seed_catalog, InMemoryStore, LoggingNotificationSink, SEED_CLASS, SEED_FOLLOW_UP,
    SEED_SESSION, SEED_STUDENT_USER, SEED_TUTOR, SEED_TUTOR_USER,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use mentorme::clock::ManualClock;
use mentorme::config::AppConfig;
use mentorme::error::AppError;
use mentorme::workflows::domain::{ClassId, TutorId, UserId};
use mentorme::workflows::matching::{MatchingEngine, MatchingRequest, MatchingService};
use mentorme::workflows::sessions::{SessionConfirmationService, SessionId, SessionView};
use mentorme::workflows::trust::TrustScoreEngine;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Day of the first sample session (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub(crate) date: Option<NaiveDate>,
    /// Subject used for the tutor matching step.
    #[arg(long, default_value = "math")]
    pub(crate) subject: String,
    /// Grade level used for the tutor matching step.
    #[arg(long, default_value = "grade 10")]
    pub(crate) grade: String,
    /// Hourly budget used for the tutor matching step.
    #[arg(long, default_value_t = 160.0)]
    pub(crate) budget: f64,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        date,
        subject,
        grade,
        budget,
    } = args;

    let config = AppConfig::load()?;
    let day = date.unwrap_or_else(|| Utc::now().date_naive());
    let first_session_at = at(day, 14, 0);

    let store = Arc::new(InMemoryStore::default());
    let clock = Arc::new(ManualClock::new(first_session_at - Duration::minutes(10)));
    let trust = Arc::new(TrustScoreEngine::new(store.clone(), clock.clone()));
    seed_catalog(&store, &trust, first_session_at)?;

    let notifications = LoggingNotificationSink::default();
    let sessions = SessionConfirmationService::new(
        store.clone(),
        store.clone(),
        Arc::new(notifications.clone()),
        trust.clone(),
        clock.clone(),
    );
    let matching = MatchingService::new(store.clone(), MatchingEngine::default(), config.matching);

    let tutor = UserId(SEED_TUTOR_USER.to_string());
    let student = UserId(SEED_STUDENT_USER.to_string());
    let first = SessionId(SEED_SESSION.to_string());
    let follow_up = SessionId(SEED_FOLLOW_UP.to_string());

    println!("Session confirmation demo");
    println!("- {} scheduled at {}", first, first_session_at);

    render_step("tutor confirms start", &sessions.start(&first, &tutor)?);
    clock.advance(Duration::minutes(2));
    render_step("student confirms start", &sessions.start(&first, &student)?);

    clock.set(first_session_at + Duration::minutes(125));
    render_step("tutor confirms completion", &sessions.complete(&first, &tutor)?);
    render_step("student confirms completion", &sessions.complete(&first, &student)?);

    let stats = trust.tutor_stats(&TutorId(SEED_TUTOR.to_string()))?;
    println!("\nTrust score for {}", SEED_TUTOR);
    println!(
        "- {} bookings | {} completed | {} cancelled by tutor",
        stats.total_bookings, stats.total_completed_bookings, stats.total_cancelled_bookings
    );
    println!("- score {:.1}", stats.trust_score);

    println!("\nDispute demo ({})", follow_up);
    let follow_up_at = first_session_at + Duration::days(1);
    clock.set(follow_up_at - Duration::minutes(10));
    render_step("tutor confirms start", &sessions.start(&follow_up, &tutor)?);
    clock.set(follow_up_at + Duration::minutes(355));
    let view = sessions.complete(&follow_up, &student)?;
    render_step("student confirms completion without confirming start", &view);
    match view.dispute_flagged_at {
        Some(flagged_at) => println!("  flagged for dispute at {}", flagged_at),
        None => println!("  no dispute raised"),
    }

    println!("\nTutor matching ({} / {} / {:.0} per hour)", subject, grade, budget);
    let ranked = matching.match_tutors(&MatchingRequest {
        subject_id: subject,
        grade_level: grade,
        budget_per_hour: budget,
        ..MatchingRequest::default()
    })?;
    if ranked.is_empty() {
        println!("- no verified tutors matched");
    }
    for (position, candidate) in ranked.iter().enumerate() {
        println!(
            "- #{} {} score {:.1} (trust {:.1}, rating {:.1}, price penalty {:.1})",
            position + 1,
            candidate.tutor.tutor_id,
            candidate.match_score,
            candidate.breakdown.trust,
            candidate.breakdown.rating,
            candidate.breakdown.price_penalty
        );
    }

    let mut delivered: BTreeMap<&'static str, usize> = BTreeMap::new();
    for event in notifications.events() {
        *delivered.entry(event.kind.code()).or_default() += 1;
    }
    println!("\nNotifications delivered");
    for (code, count) in delivered {
        println!("- {}: {}", code, count);
    }
    println!(
        "- class {} closed: {}",
        SEED_CLASS,
        store.class_closed(&ClassId(SEED_CLASS.to_string()))
    );

    Ok(())
}

fn render_step(label: &str, view: &SessionView) {
    println!("- {} -> {}", label, view.status.label());
}

fn at(day: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&day.and_time(time))
}
