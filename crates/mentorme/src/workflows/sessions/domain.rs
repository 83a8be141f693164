use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::domain::{
    BookingStatus, ClassId, TutorId, UserId, VerificationStatus,
};

/// Identifier wrapper for scheduled sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a single teaching occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Missed,
}

impl SessionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Missed => "missed",
        }
    }

    /// States set by collaborators that the confirmation operations may not move out of.
    pub const fn is_closed_externally(self) -> bool {
        matches!(self, SessionStatus::Cancelled | SessionStatus::Missed)
    }
}

/// Which side of a session an actor speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Tutor,
    Student,
}

impl ActorRole {
    pub const fn counterpart(self) -> Self {
        match self {
            ActorRole::Tutor => ActorRole::Student,
            ActorRole::Student => ActorRole::Tutor,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Tutor => "tutor",
            ActorRole::Student => "student",
        }
    }
}

/// The two attestation rounds a session goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationPhase {
    Start,
    Completion,
}

impl ConfirmationPhase {
    pub const fn label(self) -> &'static str {
        match self {
            ConfirmationPhase::Start => "start",
            ConfirmationPhase::Completion => "completion",
        }
    }
}

/// Independent confirmation instants from both parties for one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmations {
    pub tutor: Option<DateTime<Utc>>,
    pub student: Option<DateTime<Utc>>,
}

impl Confirmations {
    pub fn get(&self, role: ActorRole) -> Option<DateTime<Utc>> {
        match role {
            ActorRole::Tutor => self.tutor,
            ActorRole::Student => self.student,
        }
    }

    pub fn is_confirmed(&self, role: ActorRole) -> bool {
        self.get(role).is_some()
    }

    /// Record `role`'s confirmation unless one already exists. Returns whether a write happened.
    pub fn record(&mut self, role: ActorRole, at: DateTime<Utc>) -> bool {
        let slot = match role {
            ActorRole::Tutor => &mut self.tutor,
            ActorRole::Student => &mut self.student,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(at);
        true
    }

    pub fn both(&self) -> bool {
        self.tutor.is_some() && self.student.is_some()
    }

    /// The single confirmation present while the other side is still silent.
    pub fn unanswered(&self) -> Option<(ActorRole, DateTime<Utc>)> {
        match (self.tutor, self.student) {
            (Some(at), None) => Some((ActorRole::Tutor, at)),
            (None, Some(at)) => Some((ActorRole::Student, at)),
            _ => None,
        }
    }
}

/// Persisted session state. Mutated only through the confirmation state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub class_id: ClassId,
    pub scheduled_start_at: DateTime<Utc>,
    pub scheduled_end_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub start: Confirmations,
    pub complete: Confirmations,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub dispute_flagged_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped by the repository on every successful save.
    pub version: u64,
}

impl SessionRecord {
    /// A freshly booked session awaiting both parties.
    pub fn scheduled(
        id: SessionId,
        class_id: ClassId,
        scheduled_start_at: DateTime<Utc>,
        scheduled_end_at: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        if scheduled_end_at <= scheduled_start_at {
            return Err(ScheduleError::EndNotAfterStart {
                start: scheduled_start_at,
                end: scheduled_end_at,
            });
        }

        Ok(Self {
            id,
            class_id,
            scheduled_start_at,
            scheduled_end_at,
            status: SessionStatus::Scheduled,
            start: Confirmations::default(),
            complete: Confirmations::default(),
            started_at: None,
            completed_at: None,
            dispute_flagged_at: None,
            version: 0,
        })
    }

    pub fn confirmations(&self, phase: ConfirmationPhase) -> &Confirmations {
        match phase {
            ConfirmationPhase::Start => &self.start,
            ConfirmationPhase::Completion => &self.complete,
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id.clone(),
            class_id: self.class_id.clone(),
            scheduled_start_at: self.scheduled_start_at,
            scheduled_end_at: self.scheduled_end_at,
            status: self.status,
            started_at: self.started_at,
            completed_at: self.completed_at,
            dispute_flagged_at: self.dispute_flagged_at,
            tutor_start_confirmed: self.start.tutor.is_some(),
            student_start_confirmed: self.start.student.is_some(),
            tutor_complete_confirmed: self.complete.tutor.is_some(),
            student_complete_confirmed: self.complete.student.is_some(),
        }
    }
}

/// Externally visible session state; confirmations are exposed as presence flags only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: SessionId,
    pub class_id: ClassId,
    pub scheduled_start_at: DateTime<Utc>,
    pub scheduled_end_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub dispute_flagged_at: Option<DateTime<Utc>>,
    pub tutor_start_confirmed: bool,
    pub student_start_confirmed: bool,
    pub tutor_complete_confirmed: bool,
    pub student_complete_confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("session must end after it starts (start {start}, end {end})")]
    EndNotAfterStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Owning tutor of a class as seen by the session workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTutor {
    pub tutor_id: TutorId,
    pub user_id: UserId,
    pub verification: VerificationStatus,
}

/// A student's booking against the class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEnrollment {
    pub student_user_id: UserId,
    pub booking_status: BookingStatus,
}

/// Flat snapshot of a class assembled by the directory collaborator for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRoster {
    pub class_id: ClassId,
    pub tutor: ClassTutor,
    pub enrollments: Vec<ClassEnrollment>,
}

impl ClassRoster {
    /// Decide which side `user_id` acts for. Tutor ownership is checked before bookings.
    pub fn resolve_actor(&self, user_id: &UserId) -> Result<ActorRole, ActorRejection> {
        if &self.tutor.user_id == user_id {
            if self.tutor.verification != VerificationStatus::Verified {
                return Err(ActorRejection::Unverified);
            }
            return Ok(ActorRole::Tutor);
        }

        let holds_booking = self.enrollments.iter().any(|enrollment| {
            &enrollment.student_user_id == user_id && enrollment.booking_status.is_active()
        });
        if holds_booking {
            Ok(ActorRole::Student)
        } else {
            Err(ActorRejection::NotParticipant)
        }
    }

    /// Students holding a confirmed or trial booking.
    pub fn active_students(&self) -> impl Iterator<Item = &UserId> + '_ {
        self.enrollments
            .iter()
            .filter(|enrollment| enrollment.booking_status.is_active())
            .map(|enrollment| &enrollment.student_user_id)
    }

    /// Accounts speaking for `role` on this class.
    pub fn recipients(&self, role: ActorRole) -> Vec<UserId> {
        match role {
            ActorRole::Tutor => vec![self.tutor.user_id.clone()],
            ActorRole::Student => self.active_students().cloned().collect(),
        }
    }

    /// The tutor followed by every active student.
    pub fn everyone(&self) -> Vec<UserId> {
        let mut recipients = self.recipients(ActorRole::Tutor);
        recipients.extend(self.active_students().cloned());
        recipients
    }
}

/// Why a caller may not act on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRejection {
    NotParticipant,
    Unverified,
}

/// Completion progress of a class after a session finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassProgress {
    pub sessions_completed: u32,
    pub total_sessions: u32,
}

impl ClassProgress {
    pub const fn target_met(&self) -> bool {
        self.total_sessions > 0 && self.sessions_completed >= self.total_sessions
    }
}
