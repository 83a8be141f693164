use std::sync::Arc;

use tracing::info;

use super::repository::{TutorStats, TutorStatsRepository};
use super::score::trust_score;
use crate::clock::Clock;
use crate::workflows::domain::{RepositoryError, TutorId};

/// Anything able to rebuild a tutor's stats. Implemented by [`TrustScoreEngine`]; the session
/// workflow depends on this seam rather than the concrete engine.
pub trait TutorStatsRecalculator: Send + Sync {
    fn recalculate_tutor_stats(&self, tutor_id: &TutorId) -> Result<TutorStats, TrustScoreError>;
}

/// Re-derives trust scores from authoritative booking counts.
///
/// Callers (session completion, booking cancellation, review creation) invoke it without
/// explaining why; every run recomputes the row wholesale.
pub struct TrustScoreEngine<S> {
    stats: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> TrustScoreEngine<S>
where
    S: TutorStatsRepository + 'static,
{
    pub fn new(stats: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { stats, clock }
    }

    pub fn recalculate(&self, tutor_id: &TutorId) -> Result<TutorStats, TrustScoreError> {
        let counts = self
            .stats
            .outcome_counts(tutor_id)?
            .ok_or_else(|| TrustScoreError::TutorNotFound(tutor_id.clone()))?;

        let stats = TutorStats {
            total_bookings: counts.total,
            total_completed_bookings: counts.completed,
            total_cancelled_bookings: counts.cancelled_by_tutor,
            trust_score: trust_score(counts.completed, counts.cancelled_by_tutor),
            last_trust_score_updated_at: Some(self.clock.now()),
        };

        self.stats.save_stats(tutor_id, &stats)?;

        info!(
            tutor_id = %tutor_id,
            completed = counts.completed,
            cancelled = counts.cancelled_by_tutor,
            trust_score = stats.trust_score,
            "trust score recalculated"
        );

        Ok(stats)
    }

    pub fn tutor_stats(&self, tutor_id: &TutorId) -> Result<TutorStats, TrustScoreError> {
        self.stats
            .fetch_stats(tutor_id)?
            .ok_or_else(|| TrustScoreError::TutorNotFound(tutor_id.clone()))
    }
}

impl<S> TutorStatsRecalculator for TrustScoreEngine<S>
where
    S: TutorStatsRepository + 'static,
{
    fn recalculate_tutor_stats(&self, tutor_id: &TutorId) -> Result<TutorStats, TrustScoreError> {
        self.recalculate(tutor_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrustScoreError {
    #[error("tutor {0} not found")]
    TutorNotFound(TutorId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
