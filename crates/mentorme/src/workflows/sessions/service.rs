use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::dispute::DisputeFlag;
use super::domain::{
    ActorRejection, ActorRole, ClassRoster, ConfirmationPhase, SessionId, SessionRecord,
    SessionStatus, SessionView,
};
use super::machine::{confirm_completion, confirm_start, TransitionOutcome, TransitionRejection};
use super::repository::{
    ClassDirectory, Notification, NotificationKind, NotificationSink, SessionRepository,
};
use crate::clock::Clock;
use crate::workflows::domain::{RepositoryError, UserId};
use crate::workflows::trust::TutorStatsRecalculator;

/// Attempts at the read/mutate/save cycle before a version conflict is surfaced.
const MAX_SAVE_ATTEMPTS: usize = 3;

/// Service coordinating tutor and student attestations for scheduled sessions.
pub struct SessionConfirmationService<R, D, N> {
    sessions: Arc<R>,
    classes: Arc<D>,
    notifications: Arc<N>,
    trust: Arc<dyn TutorStatsRecalculator>,
    clock: Arc<dyn Clock>,
}

impl<R, D, N> SessionConfirmationService<R, D, N>
where
    R: SessionRepository + 'static,
    D: ClassDirectory + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        sessions: Arc<R>,
        classes: Arc<D>,
        notifications: Arc<N>,
        trust: Arc<dyn TutorStatsRecalculator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            classes,
            notifications,
            trust,
            clock,
        }
    }

    /// Confirm, on behalf of `actor`, that the session has begun.
    pub fn start(
        &self,
        session_id: &SessionId,
        actor: &UserId,
    ) -> Result<SessionView, SessionServiceError> {
        self.confirm(session_id, actor, ConfirmationPhase::Start)
    }

    /// Confirm, on behalf of `actor`, that the session has finished.
    pub fn complete(
        &self,
        session_id: &SessionId,
        actor: &UserId,
    ) -> Result<SessionView, SessionServiceError> {
        self.confirm(session_id, actor, ConfirmationPhase::Completion)
    }

    /// Read-only view of a session.
    pub fn get(&self, session_id: &SessionId) -> Result<SessionView, SessionServiceError> {
        let record = self
            .sessions
            .fetch(session_id)?
            .ok_or_else(|| SessionServiceError::NotFound(session_id.clone()))?;
        Ok(record.view())
    }

    fn confirm(
        &self,
        session_id: &SessionId,
        actor: &UserId,
        phase: ConfirmationPhase,
    ) -> Result<SessionView, SessionServiceError> {
        let mut attempt = 1;
        loop {
            let mut record = self
                .sessions
                .fetch(session_id)?
                .ok_or_else(|| SessionServiceError::NotFound(session_id.clone()))?;
            let roster = self
                .classes
                .roster(&record.class_id)?
                .ok_or_else(|| SessionServiceError::NotFound(session_id.clone()))?;
            let role = roster.resolve_actor(actor).map_err(|rejection| match rejection {
                ActorRejection::NotParticipant => SessionServiceError::Forbidden,
                ActorRejection::Unverified => SessionServiceError::Unverified,
            })?;

            let now = self.clock.now();
            let outcome = match phase {
                ConfirmationPhase::Start => confirm_start(&mut record, role, now),
                ConfirmationPhase::Completion => confirm_completion(&mut record, role, now),
            }
            .map_err(|rejection| SessionServiceError::from_rejection(rejection, &record))?;

            if !outcome.changed() {
                debug!(
                    session_id = %session_id,
                    actor = role.label(),
                    phase = phase.label(),
                    "confirmation already recorded"
                );
                return Ok(record.view());
            }

            match self.sessions.save(record) {
                Ok(saved) => {
                    self.after_commit(&saved, &roster, &outcome);
                    return Ok(saved.view());
                }
                Err(RepositoryError::Conflict) if attempt < MAX_SAVE_ATTEMPTS => {
                    debug!(
                        session_id = %session_id,
                        attempt,
                        "concurrent session write, retrying"
                    );
                    attempt += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn after_commit(
        &self,
        session: &SessionRecord,
        roster: &ClassRoster,
        outcome: &TransitionOutcome,
    ) {
        let phase = outcome.phase;

        if outcome.recorded && !outcome.counterpart_confirmed {
            let (title, body, kind) = waiting_copy(phase, outcome.actor);
            for user_id in roster.recipients(outcome.actor.counterpart()) {
                self.send(session, user_id, title, body, kind);
            }
        }

        if outcome.transitioned {
            match session.status {
                SessionStatus::InProgress => {
                    info!(
                        session_id = %session.id,
                        class_id = %session.class_id,
                        "session started"
                    );
                    for user_id in roster.everyone() {
                        self.send(
                            session,
                            user_id,
                            "Session started",
                            "Both parties confirmed the start; the session is in progress.",
                            NotificationKind::SessionStarted,
                        );
                    }
                }
                SessionStatus::Completed => {
                    info!(
                        session_id = %session.id,
                        class_id = %session.class_id,
                        "session completed"
                    );
                    for user_id in roster.everyone() {
                        self.send(
                            session,
                            user_id,
                            "Session completed",
                            "Both parties confirmed the session has finished.",
                            NotificationKind::SessionCompleted,
                        );
                    }
                    self.record_class_progress(session);
                    if let Err(error) = self.trust.recalculate_tutor_stats(&roster.tutor.tutor_id) {
                        warn!(
                            tutor_id = %roster.tutor.tutor_id,
                            %error,
                            "trust score recalculation failed after session completion"
                        );
                    }
                }
                _ => {}
            }
        }

        if let Some(dispute) = &outcome.dispute {
            self.announce_dispute(session, roster, dispute);
        }
    }

    fn record_class_progress(&self, session: &SessionRecord) {
        let progress = match self.classes.record_session_completed(&session.class_id) {
            Ok(progress) => progress,
            Err(error) => {
                warn!(class_id = %session.class_id, %error, "failed to record class progress");
                return;
            }
        };

        if progress.target_met() {
            match self.classes.mark_class_completed(&session.class_id) {
                Ok(()) => info!(
                    class_id = %session.class_id,
                    sessions = progress.sessions_completed,
                    "class reached its session target"
                ),
                Err(error) => {
                    warn!(class_id = %session.class_id, %error, "failed to close completed class")
                }
            }
        }
    }

    fn announce_dispute(
        &self,
        session: &SessionRecord,
        roster: &ClassRoster,
        dispute: &DisputeFlag,
    ) {
        warn!(
            session_id = %session.id,
            phase = dispute.phase.label(),
            confirmed_by = dispute.confirmed_by.label(),
            confirmed_at = %dispute.confirmed_at,
            "session flagged for dispute"
        );
        for user_id in roster.everyone() {
            self.send(
                session,
                user_id,
                "Session needs review",
                "One side of this session has gone unconfirmed and it was flagged for dispute.",
                NotificationKind::SessionDispute,
            );
        }
    }

    fn send(
        &self,
        session: &SessionRecord,
        user_id: UserId,
        title: &str,
        body: &str,
        kind: NotificationKind,
    ) {
        let mut metadata = BTreeMap::new();
        metadata.insert("session_id".to_string(), session.id.0.clone());
        metadata.insert("class_id".to_string(), session.class_id.0.clone());

        let notification = Notification {
            user_id: user_id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            kind,
            metadata,
        };
        if let Err(error) = self.notifications.notify(notification) {
            warn!(user_id = %user_id, kind = kind.code(), %error, "notification dispatch failed");
        }
    }
}

fn waiting_copy(
    phase: ConfirmationPhase,
    confirmed_by: ActorRole,
) -> (&'static str, &'static str, NotificationKind) {
    match (phase, confirmed_by) {
        (ConfirmationPhase::Start, ActorRole::Tutor) => (
            "Confirm session start",
            "Your tutor confirmed the session has started. Please confirm.",
            NotificationKind::SessionWaitStart,
        ),
        (ConfirmationPhase::Start, ActorRole::Student) => (
            "Confirm session start",
            "Your student confirmed the session has started. Please confirm.",
            NotificationKind::SessionWaitStart,
        ),
        (ConfirmationPhase::Completion, ActorRole::Tutor) => (
            "Confirm session completion",
            "Your tutor confirmed the session has finished.",
            NotificationKind::SessionWaitComplete,
        ),
        (ConfirmationPhase::Completion, ActorRole::Student) => (
            "Confirm session completion",
            "Your student confirmed the session has finished.",
            NotificationKind::SessionWaitComplete,
        ),
    }
}

/// Error raised by the session confirmation service.
#[derive(Debug, thiserror::Error)]
pub enum SessionServiceError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error("caller is neither the class tutor nor a booked student")]
    Forbidden,
    #[error("tutor account is not verified")]
    Unverified,
    #[error("start can only be confirmed between {opens} and {closes}")]
    OutsideWindow {
        opens: DateTime<Utc>,
        closes: DateTime<Utc>,
    },
    #[error("session cannot be completed before {scheduled_end_at}")]
    TooEarly { scheduled_end_at: DateTime<Utc> },
    #[error("session is already {}", .0.label())]
    TerminalState(SessionStatus),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SessionServiceError {
    fn from_rejection(rejection: TransitionRejection, record: &SessionRecord) -> Self {
        match rejection {
            TransitionRejection::OutsideWindow => {
                let (opens, closes) = super::window::start_window(record.scheduled_start_at);
                SessionServiceError::OutsideWindow { opens, closes }
            }
            TransitionRejection::TooEarly => SessionServiceError::TooEarly {
                scheduled_end_at: record.scheduled_end_at,
            },
            TransitionRejection::TerminalState(status) => {
                SessionServiceError::TerminalState(status)
            }
        }
    }
}
