use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::clock::ManualClock;
use crate::workflows::domain::{
    BookingStatus, ClassId, RepositoryError, TutorId, UserId, VerificationStatus,
};
use crate::workflows::sessions::domain::{
    ClassEnrollment, ClassProgress, ClassRoster, ClassTutor, SessionId, SessionRecord,
};
use crate::workflows::sessions::repository::{
    ClassDirectory, Notification, NotificationError, NotificationKind, NotificationSink,
    SessionRepository,
};
use crate::workflows::sessions::SessionConfirmationService;
use crate::workflows::trust::{TrustScoreError, TutorStats, TutorStatsRecalculator};

pub(super) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

pub(super) fn session_id() -> SessionId {
    SessionId("sess-0001".to_string())
}

pub(super) fn class_id() -> ClassId {
    ClassId("class-math-9".to_string())
}

pub(super) fn tutor_user() -> UserId {
    UserId("user-tutor".to_string())
}

pub(super) fn tutor_id() -> TutorId {
    TutorId("tutor-0001".to_string())
}

pub(super) fn student_user() -> UserId {
    UserId("user-student".to_string())
}

pub(super) fn pending_student() -> UserId {
    UserId("user-pending".to_string())
}

pub(super) fn trial_student() -> UserId {
    UserId("user-trial".to_string())
}

pub(super) fn stranger() -> UserId {
    UserId("user-stranger".to_string())
}

/// 14:00 to 16:00 session on the fixture class.
pub(super) fn scheduled_session() -> SessionRecord {
    SessionRecord::scheduled(session_id(), class_id(), at(14, 0), at(16, 0))
        .expect("valid schedule")
}

pub(super) fn roster(verification: VerificationStatus) -> ClassRoster {
    ClassRoster {
        class_id: class_id(),
        tutor: ClassTutor {
            tutor_id: tutor_id(),
            user_id: tutor_user(),
            verification,
        },
        enrollments: vec![
            ClassEnrollment {
                student_user_id: student_user(),
                booking_status: BookingStatus::Confirmed,
            },
            ClassEnrollment {
                student_user_id: pending_student(),
                booking_status: BookingStatus::Pending,
            },
        ],
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
    rosters: Mutex<HashMap<ClassId, ClassRoster>>,
    progress: Mutex<HashMap<ClassId, ClassProgress>>,
    closed: Mutex<Vec<ClassId>>,
}

impl MemoryStore {
    pub(super) fn seeded(total_sessions: u32, verification: VerificationStatus) -> Self {
        let store = Self::default();
        store.put_session(scheduled_session());
        store
            .rosters
            .lock()
            .expect("lock")
            .insert(class_id(), roster(verification));
        store.progress.lock().expect("lock").insert(
            class_id(),
            ClassProgress {
                sessions_completed: 0,
                total_sessions,
            },
        );
        store
    }

    pub(super) fn enroll(&self, student_user_id: UserId, booking_status: BookingStatus) {
        self.rosters
            .lock()
            .expect("lock")
            .get_mut(&class_id())
            .expect("fixture roster present")
            .enrollments
            .push(ClassEnrollment {
                student_user_id,
                booking_status,
            });
    }

    pub(super) fn put_session(&self, record: SessionRecord) {
        self.sessions
            .lock()
            .expect("lock")
            .insert(record.id.clone(), record);
    }

    pub(super) fn session(&self) -> SessionRecord {
        self.sessions
            .lock()
            .expect("lock")
            .get(&session_id())
            .cloned()
            .expect("fixture session present")
    }

    pub(super) fn progress(&self) -> ClassProgress {
        *self
            .progress
            .lock()
            .expect("lock")
            .get(&class_id())
            .expect("fixture progress present")
    }

    pub(super) fn closed_classes(&self) -> Vec<ClassId> {
        self.closed.lock().expect("lock").clone()
    }
}

impl SessionRepository for MemoryStore {
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        Ok(self.sessions.lock().expect("lock").get(id).cloned())
    }

    fn save(&self, mut record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let mut guard = self.sessions.lock().expect("lock");
        match guard.get(&record.id) {
            None => Err(RepositoryError::NotFound),
            Some(stored) if stored.version != record.version => Err(RepositoryError::Conflict),
            Some(_) => {
                record.version += 1;
                guard.insert(record.id.clone(), record.clone());
                Ok(record)
            }
        }
    }
}

impl ClassDirectory for MemoryStore {
    fn roster(&self, class_id: &ClassId) -> Result<Option<ClassRoster>, RepositoryError> {
        Ok(self.rosters.lock().expect("lock").get(class_id).cloned())
    }

    fn record_session_completed(
        &self,
        class_id: &ClassId,
    ) -> Result<ClassProgress, RepositoryError> {
        let mut guard = self.progress.lock().expect("lock");
        let progress = guard.get_mut(class_id).ok_or(RepositoryError::NotFound)?;
        progress.sessions_completed += 1;
        Ok(*progress)
    }

    fn mark_class_completed(&self, class_id: &ClassId) -> Result<(), RepositoryError> {
        self.closed.lock().expect("lock").push(class_id.clone());
        Ok(())
    }
}

/// Wraps a store and fails the first `conflicts` saves with a version conflict.
pub(super) struct ContendedStore {
    pub(super) inner: MemoryStore,
    conflicts: AtomicUsize,
}

impl ContendedStore {
    pub(super) fn new(inner: MemoryStore, conflicts: usize) -> Self {
        Self {
            inner,
            conflicts: AtomicUsize::new(conflicts),
        }
    }
}

impl SessionRepository for ContendedStore {
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn save(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Conflict);
        }
        self.inner.save(record)
    }
}

/// Reads succeed, writes fail.
pub(super) struct ReadOnlyStore {
    pub(super) inner: MemoryStore,
}

impl SessionRepository for ReadOnlyStore {
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn save(&self, _record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifications {
    events: Mutex<Vec<Notification>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("lock").clone()
    }

    pub(super) fn of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter(|event| event.kind == kind)
            .collect()
    }
}

impl NotificationSink for MemoryNotifications {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events.lock().expect("lock").push(notification);
        Ok(())
    }
}

pub(super) struct BrokenNotifications;

impl NotificationSink for BrokenNotifications {
    fn notify(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("push gateway down".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingTrust {
    calls: Mutex<Vec<TutorId>>,
}

impl RecordingTrust {
    pub(super) fn calls(&self) -> Vec<TutorId> {
        self.calls.lock().expect("lock").clone()
    }
}

impl TutorStatsRecalculator for RecordingTrust {
    fn recalculate_tutor_stats(&self, tutor_id: &TutorId) -> Result<TutorStats, TrustScoreError> {
        self.calls.lock().expect("lock").push(tutor_id.clone());
        Ok(TutorStats::default())
    }
}

pub(super) type MemoryService =
    SessionConfirmationService<MemoryStore, MemoryStore, MemoryNotifications>;

pub(super) struct Fixture {
    pub(super) service: MemoryService,
    pub(super) store: Arc<MemoryStore>,
    pub(super) notifications: Arc<MemoryNotifications>,
    pub(super) trust: Arc<RecordingTrust>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn fixture_with(total_sessions: u32, verification: VerificationStatus) -> Fixture {
    let store = Arc::new(MemoryStore::seeded(total_sessions, verification));
    let notifications = Arc::new(MemoryNotifications::default());
    let trust = Arc::new(RecordingTrust::default());
    let clock = Arc::new(ManualClock::new(at(13, 50)));
    let service = SessionConfirmationService::new(
        store.clone(),
        store.clone(),
        notifications.clone(),
        trust.clone(),
        clock.clone(),
    );
    Fixture {
        service,
        store,
        notifications,
        trust,
        clock,
    }
}

pub(super) fn fixture() -> Fixture {
    fixture_with(4, VerificationStatus::Verified)
}
