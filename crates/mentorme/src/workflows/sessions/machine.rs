//! Pure confirmation transitions applied to a session snapshot.

use chrono::{DateTime, Utc};

use super::dispute::{flag_if_disputed, DisputeFlag};
use super::domain::{ActorRole, ConfirmationPhase, SessionRecord, SessionStatus};
use super::window::{completion_open, within_start_window};

/// Rejections raised by the timing and state rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejection {
    OutsideWindow,
    TooEarly,
    TerminalState(SessionStatus),
}

/// What a single confirmation call changed on the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub phase: ConfirmationPhase,
    pub actor: ActorRole,
    /// The actor's confirmation was written by this call (false on repeats).
    pub recorded: bool,
    /// The counterpart had confirmed this phase when the call finished.
    pub counterpart_confirmed: bool,
    /// Status moved to IN_PROGRESS / COMPLETED on this call.
    pub transitioned: bool,
    pub dispute: Option<DisputeFlag>,
}

impl TransitionOutcome {
    pub fn changed(&self) -> bool {
        self.recorded || self.transitioned || self.dispute.is_some()
    }
}

pub fn confirm_start(
    session: &mut SessionRecord,
    actor: ActorRole,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, TransitionRejection> {
    if session.status.is_closed_externally() {
        return Err(TransitionRejection::TerminalState(session.status));
    }
    if !within_start_window(session.scheduled_start_at, now) {
        return Err(TransitionRejection::OutsideWindow);
    }

    let recorded = session.start.record(actor, now);

    let mut transitioned = false;
    if session.start.both() && session.status == SessionStatus::Scheduled {
        session.status = SessionStatus::InProgress;
        session.started_at.get_or_insert(now);
        transitioned = true;
    }

    let dispute = flag_if_disputed(session, now);

    Ok(TransitionOutcome {
        phase: ConfirmationPhase::Start,
        actor,
        recorded,
        counterpart_confirmed: session.start.is_confirmed(actor.counterpart()),
        transitioned,
        dispute,
    })
}

pub fn confirm_completion(
    session: &mut SessionRecord,
    actor: ActorRole,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, TransitionRejection> {
    if !completion_open(session.scheduled_end_at, now) {
        return Err(TransitionRejection::TooEarly);
    }
    if session.status.is_closed_externally() {
        return Err(TransitionRejection::TerminalState(session.status));
    }

    let recorded = session.complete.record(actor, now);

    let mut transitioned = false;
    if session.complete.both() && session.status != SessionStatus::Completed {
        session.status = SessionStatus::Completed;
        session.completed_at.get_or_insert(now);
        transitioned = true;
    }

    let dispute = flag_if_disputed(session, now);

    Ok(TransitionOutcome {
        phase: ConfirmationPhase::Completion,
        actor,
        recorded,
        counterpart_confirmed: session.complete.is_confirmed(actor.counterpart()),
        transitioned,
        dispute,
    })
}
