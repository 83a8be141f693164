use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{ClassProgress, ClassRoster, SessionId, SessionRecord};
use crate::workflows::domain::{ClassId, RepositoryError, UserId};

/// Durable session storage with optimistic concurrency.
pub trait SessionRepository: Send + Sync {
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;

    /// Persist `record` if the stored version still equals `record.version`.
    ///
    /// Returns the stored copy with its bumped version, or [`RepositoryError::Conflict`] when
    /// another writer got there first. A failed save must leave the stored row untouched.
    fn save(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError>;
}

/// Class-side collaborator: participants, verification, and completion progress.
pub trait ClassDirectory: Send + Sync {
    fn roster(&self, class_id: &ClassId) -> Result<Option<ClassRoster>, RepositoryError>;

    /// Bump the class's completed-session counter.
    fn record_session_completed(&self, class_id: &ClassId)
        -> Result<ClassProgress, RepositoryError>;

    /// Move the class lifecycle to completed once its session target is met.
    fn mark_class_completed(&self, class_id: &ClassId) -> Result<(), RepositoryError>;
}

/// Fire-and-forget outbound notifications (in-app, push, e-mail adapters).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Notification categories emitted by the session workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    SessionWaitStart,
    SessionStarted,
    SessionWaitComplete,
    SessionCompleted,
    SessionDispute,
}

impl NotificationKind {
    pub const fn code(self) -> &'static str {
        match self {
            NotificationKind::SessionWaitStart => "SESSION_WAIT_START",
            NotificationKind::SessionStarted => "SESSION_STARTED",
            NotificationKind::SessionWaitComplete => "SESSION_WAIT_COMPLETE",
            NotificationKind::SessionCompleted => "SESSION_COMPLETED",
            NotificationKind::SessionDispute => "SESSION_DISPUTE",
        }
    }
}

/// Payload handed to the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub metadata: BTreeMap<String, String>,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
