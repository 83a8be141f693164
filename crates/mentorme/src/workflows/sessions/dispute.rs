//! One-sided confirmation detection.
//!
//! A session is disputed when one party confirmed a phase and the other has stayed silent for
//! at least [`DISPUTE_THRESHOLD_HOURS`](super::window::DISPUTE_THRESHOLD_HOURS). Detection only
//! happens when either party calls in; there is no background sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ActorRole, ConfirmationPhase, SessionRecord};
use super::window::dispute_threshold;

/// Evidence attached to a freshly raised dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeFlag {
    pub phase: ConfirmationPhase,
    pub confirmed_by: ActorRole,
    pub confirmed_at: DateTime<Utc>,
    pub flagged_at: DateTime<Utc>,
}

impl DisputeFlag {
    pub fn waiting_on(&self) -> ActorRole {
        self.confirmed_by.counterpart()
    }
}

/// Evaluate the dispute rule against `session` at `now` without mutating it.
///
/// Sessions already flagged are never re-evaluated. The start phase is checked first and a
/// start dispute short-circuits the completion check.
pub fn detect(session: &SessionRecord, now: DateTime<Utc>) -> Option<DisputeFlag> {
    if session.dispute_flagged_at.is_some() {
        return None;
    }

    [ConfirmationPhase::Start, ConfirmationPhase::Completion]
        .into_iter()
        .find_map(|phase| {
            let (confirmed_by, confirmed_at) = session.confirmations(phase).unanswered()?;
            (now - confirmed_at >= dispute_threshold()).then_some(DisputeFlag {
                phase,
                confirmed_by,
                confirmed_at,
                flagged_at: now,
            })
        })
}

/// Run [`detect`] and stamp the session when it fires.
pub fn flag_if_disputed(session: &mut SessionRecord, now: DateTime<Utc>) -> Option<DisputeFlag> {
    let flag = detect(session, now)?;
    session.dispute_flagged_at = Some(flag.flagged_at);
    Some(flag)
}
