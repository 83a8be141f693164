//! Two-party session confirmation.
//!
//! A tutor and a student independently attest that a scheduled session started and that it
//! finished. The state machine only advances once both sides agree, and a confirmation left
//! unanswered for too long raises a dispute flag that is never cleared.

pub mod dispute;
pub mod domain;
pub mod machine;
pub mod repository;
pub mod router;
pub mod service;
pub mod window;

#[cfg(test)]
mod tests;

pub use dispute::DisputeFlag;
pub use domain::{
    ActorRole, ClassEnrollment, ClassProgress, ClassRoster, ClassTutor, ConfirmationPhase,
    Confirmations, ScheduleError, SessionId, SessionRecord, SessionStatus, SessionView,
};
pub use repository::{
    ClassDirectory, Notification, NotificationError, NotificationKind, NotificationSink,
    SessionRepository,
};
pub use router::{session_router, ACTOR_HEADER};
pub use service::{SessionConfirmationService, SessionServiceError};
