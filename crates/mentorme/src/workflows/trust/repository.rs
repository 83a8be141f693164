use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::score::BookingOutcomeCounts;
use crate::workflows::domain::{RepositoryError, TutorId};

/// Aggregate reputation row owned by one tutor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TutorStats {
    pub total_bookings: u64,
    pub total_completed_bookings: u64,
    pub total_cancelled_bookings: u64,
    pub trust_score: f64,
    pub last_trust_score_updated_at: Option<DateTime<Utc>>,
}

/// Storage seam for booking counts and the derived stats row.
pub trait TutorStatsRepository: Send + Sync {
    /// Current counts for the tutor, or `None` when the tutor profile does not exist.
    fn outcome_counts(
        &self,
        tutor_id: &TutorId,
    ) -> Result<Option<BookingOutcomeCounts>, RepositoryError>;

    fn fetch_stats(&self, tutor_id: &TutorId) -> Result<Option<TutorStats>, RepositoryError>;

    /// Write counts and score together.
    fn save_stats(&self, tutor_id: &TutorId, stats: &TutorStats) -> Result<(), RepositoryError>;
}
