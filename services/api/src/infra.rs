use chrono::{DateTime, Duration, Utc};
use mentorme::error::AppError;
use mentorme::workflows::domain::{
    BookingStatus, CancelledBy, ClassId, RepositoryError, TutorId, UserId, VerificationStatus,
};
use mentorme::workflows::matching::{
    CandidateFilter, CandidateSupplier, ClassOffering, MatchingService, OfferingStatus,
    TutorCandidate,
};
use mentorme::workflows::sessions::{
    ClassDirectory, ClassEnrollment, ClassProgress, ClassRoster, ClassTutor, Notification,
    NotificationError, NotificationSink, SessionConfirmationService, SessionId, SessionRecord,
    SessionRepository,
};
use mentorme::workflows::trust::{
    BookingOutcomeCounts, BookingSummary, TrustScoreEngine, TutorStats, TutorStatsRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

pub(crate) type Sessions =
    SessionConfirmationService<InMemoryStore, InMemoryStore, LoggingNotificationSink>;
pub(crate) type TrustEngine = TrustScoreEngine<InMemoryStore>;
pub(crate) type Matching = MatchingService<InMemoryStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Debug, Clone)]
struct ClassEntry {
    roster: ClassRoster,
    progress: ClassProgress,
    closed: bool,
}

#[derive(Debug, Clone)]
struct TutorEntry {
    verification: VerificationStatus,
    profile: TutorCandidate,
}

/// Single-process stand-in for the database, implementing every storage seam of the core.
#[derive(Default, Clone)]
pub(crate) struct InMemoryStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
    classes: Arc<Mutex<HashMap<ClassId, ClassEntry>>>,
    tutors: Arc<Mutex<Vec<TutorEntry>>>,
    bookings: Arc<Mutex<HashMap<TutorId, Vec<BookingSummary>>>>,
    stats: Arc<Mutex<HashMap<TutorId, TutorStats>>>,
}

impl InMemoryStore {
    pub(crate) fn register_tutor(&self, verification: VerificationStatus, profile: TutorCandidate) {
        self.stats
            .lock()
            .expect("stats mutex poisoned")
            .entry(profile.tutor_id.clone())
            .or_default();
        self.tutors
            .lock()
            .expect("tutor mutex poisoned")
            .push(TutorEntry {
                verification,
                profile,
            });
    }

    pub(crate) fn add_class(&self, roster: ClassRoster, total_sessions: u32) {
        let entry = ClassEntry {
            progress: ClassProgress {
                sessions_completed: 0,
                total_sessions,
            },
            roster,
            closed: false,
        };
        self.classes
            .lock()
            .expect("class mutex poisoned")
            .insert(entry.roster.class_id.clone(), entry);
    }

    pub(crate) fn add_session(&self, record: SessionRecord) {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(record.id.clone(), record);
    }

    pub(crate) fn record_booking(&self, tutor_id: &TutorId, booking: BookingSummary) {
        self.bookings
            .lock()
            .expect("booking mutex poisoned")
            .entry(tutor_id.clone())
            .or_default()
            .push(booking);
    }

    pub(crate) fn class_closed(&self, class_id: &ClassId) -> bool {
        self.classes
            .lock()
            .expect("class mutex poisoned")
            .get(class_id)
            .is_some_and(|entry| entry.closed)
    }
}

impl SessionRepository for InMemoryStore {
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.sessions.lock().expect("session mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn save(&self, mut record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        let stored = guard.get(&record.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::Conflict);
        }
        record.version += 1;
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

impl ClassDirectory for InMemoryStore {
    fn roster(&self, class_id: &ClassId) -> Result<Option<ClassRoster>, RepositoryError> {
        let guard = self.classes.lock().expect("class mutex poisoned");
        Ok(guard.get(class_id).map(|entry| entry.roster.clone()))
    }

    fn record_session_completed(
        &self,
        class_id: &ClassId,
    ) -> Result<ClassProgress, RepositoryError> {
        let mut guard = self.classes.lock().expect("class mutex poisoned");
        let entry = guard.get_mut(class_id).ok_or(RepositoryError::NotFound)?;
        entry.progress.sessions_completed += 1;
        Ok(entry.progress)
    }

    fn mark_class_completed(&self, class_id: &ClassId) -> Result<(), RepositoryError> {
        let mut guard = self.classes.lock().expect("class mutex poisoned");
        let entry = guard.get_mut(class_id).ok_or(RepositoryError::NotFound)?;
        entry.closed = true;
        Ok(())
    }
}

impl TutorStatsRepository for InMemoryStore {
    fn outcome_counts(
        &self,
        tutor_id: &TutorId,
    ) -> Result<Option<BookingOutcomeCounts>, RepositoryError> {
        if !self
            .stats
            .lock()
            .expect("stats mutex poisoned")
            .contains_key(tutor_id)
        {
            return Ok(None);
        }
        let guard = self.bookings.lock().expect("booking mutex poisoned");
        let bookings = guard.get(tutor_id).map(Vec::as_slice).unwrap_or_default();
        Ok(Some(BookingOutcomeCounts::tally(bookings)))
    }

    fn fetch_stats(&self, tutor_id: &TutorId) -> Result<Option<TutorStats>, RepositoryError> {
        let guard = self.stats.lock().expect("stats mutex poisoned");
        Ok(guard.get(tutor_id).cloned())
    }

    fn save_stats(&self, tutor_id: &TutorId, stats: &TutorStats) -> Result<(), RepositoryError> {
        let mut guard = self.stats.lock().expect("stats mutex poisoned");
        guard.insert(tutor_id.clone(), stats.clone());
        Ok(())
    }
}

impl CandidateSupplier for InMemoryStore {
    fn candidates(&self, filter: &CandidateFilter) -> Result<Vec<TutorCandidate>, RepositoryError> {
        let stats = self.stats.lock().expect("stats mutex poisoned");
        let tutors = self.tutors.lock().expect("tutor mutex poisoned");
        Ok(tutors
            .iter()
            .filter(|entry| entry.verification == VerificationStatus::Verified)
            .filter(|entry| matches_location(&entry.profile, filter))
            .map(|entry| {
                let mut profile = entry.profile.clone();
                let row = stats.get(&profile.tutor_id).cloned().unwrap_or_default();
                profile.trust_score = row.trust_score;
                profile.total_completed_bookings = row.total_completed_bookings;
                profile
            })
            .collect())
    }
}

fn matches_location(profile: &TutorCandidate, filter: &CandidateFilter) -> bool {
    let same = |wanted: &Option<String>, actual: &Option<String>| match wanted {
        Some(wanted) => actual
            .as_deref()
            .is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
        None => true,
    };
    same(&filter.city, &profile.city) && same(&filter.district, &profile.district)
}

/// Notification sink that writes to the log and keeps a copy for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotificationSink {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationSink for LoggingNotificationSink {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            user_id = %notification.user_id,
            kind = notification.kind.code(),
            title = %notification.title,
            "notification dispatched"
        );
        let mut guard = self.events.lock().expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl LoggingNotificationSink {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

pub(crate) const SEED_CLASS: &str = "class-algebra-10";
pub(crate) const SEED_SESSION: &str = "sess-algebra-1";
pub(crate) const SEED_FOLLOW_UP: &str = "sess-algebra-2";
pub(crate) const SEED_TUTOR: &str = "tutor-linh";
pub(crate) const SEED_TUTOR_USER: &str = "user-linh";
pub(crate) const SEED_STUDENT_USER: &str = "user-minh";

/// Populate a small catalog: four tutors with booking histories, one class with two
/// sessions starting at `first_session_at` and one day later. Every tutor's stats row is
/// rebuilt through `trust` so reads and rankings start from the same numbers.
pub(crate) fn seed_catalog(
    store: &InMemoryStore,
    trust: &TrustEngine,
    first_session_at: DateTime<Utc>,
) -> Result<(), AppError> {
    let tutor_id = TutorId(SEED_TUTOR.to_string());
    let tutors = [
        (
            VerificationStatus::Verified,
            candidate(SEED_TUTOR, "math", "Grade 10-12", 180.0, 4.7),
        ),
        (
            VerificationStatus::Verified,
            candidate("tutor-quang", "math", "Grade 6-9", 150.0, 4.9),
        ),
        (
            VerificationStatus::Verified,
            candidate("tutor-thao", "english", "IELTS", 260.0, 4.4),
        ),
        (
            VerificationStatus::Pending,
            candidate("tutor-new", "math", "Grade 10", 90.0, 0.0),
        ),
    ];
    let seeded: Vec<TutorId> = tutors
        .iter()
        .map(|(_, profile)| profile.tutor_id.clone())
        .collect();
    for (verification, profile) in tutors {
        store.register_tutor(verification, profile);
    }

    store.add_class(
        ClassRoster {
            class_id: ClassId(SEED_CLASS.to_string()),
            tutor: ClassTutor {
                tutor_id: tutor_id.clone(),
                user_id: UserId(SEED_TUTOR_USER.to_string()),
                verification: VerificationStatus::Verified,
            },
            enrollments: vec![ClassEnrollment {
                student_user_id: UserId(SEED_STUDENT_USER.to_string()),
                booking_status: BookingStatus::Confirmed,
            }],
        },
        2,
    );

    for (id, start) in [
        (SEED_SESSION, first_session_at),
        (SEED_FOLLOW_UP, first_session_at + Duration::days(1)),
    ] {
        let record = SessionRecord::scheduled(
            SessionId(id.to_string()),
            ClassId(SEED_CLASS.to_string()),
            start,
            start + Duration::hours(2),
        )?;
        store.add_session(record);
    }

    let completed = (BookingStatus::Completed, None);
    let by_tutor = (BookingStatus::Cancelled, Some(CancelledBy::Tutor));
    let by_student = (BookingStatus::Cancelled, Some(CancelledBy::Student));
    let histories = [
        (
            SEED_TUTOR,
            vec![
                completed,
                completed,
                completed,
                by_tutor,
                by_student,
                (BookingStatus::Confirmed, None),
            ],
        ),
        ("tutor-quang", vec![completed; 6]),
        ("tutor-thao", vec![completed, completed, by_tutor]),
    ];
    for (tutor, history) in histories {
        for (status, cancelled_by) in history {
            store.record_booking(
                &TutorId(tutor.to_string()),
                BookingSummary {
                    status,
                    cancelled_by,
                },
            );
        }
    }

    for tutor_id in &seeded {
        trust.recalculate(tutor_id)?;
    }
    Ok(())
}

/// Profile without reputation numbers; trust and completions come from the stats row.
fn candidate(id: &str, subject: &str, grades: &str, price: f64, rating: f64) -> TutorCandidate {
    TutorCandidate {
        tutor_id: TutorId(id.to_string()),
        user_id: UserId(id.replacen("tutor", "user", 1)),
        bio: Some(format!("{subject} tutor for {grades}")),
        city: Some("Hanoi".to_string()),
        district: Some("Cau Giay".to_string()),
        national_id_number: Some("001090000123".to_string()),
        trust_score: 0.0,
        average_rating: rating,
        total_completed_bookings: 0,
        offerings: vec![ClassOffering {
            class_id: ClassId(format!("offering-{id}")),
            subject_id: subject.to_string(),
            target_grade: Some(grades.to_string()),
            price_per_hour: Some(price),
            status: OfferingStatus::Published,
        }],
    }
}
