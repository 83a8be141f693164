//! Trust score formula and the booking outcome counting policy it relies on.

use serde::{Deserialize, Serialize};

use crate::workflows::domain::{BookingStatus, CancelledBy};

pub const BASE_SCORE: f64 = 50.0;
pub const COMPLETION_REWARD: f64 = 2.0;
pub const CANCELLATION_PENALTY: f64 = 5.0;
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Authoritative per-tutor booking counts read from storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingOutcomeCounts {
    pub total: u64,
    pub completed: u64,
    /// Cancellations attributed to the tutor. Student and system cancellations are excluded.
    pub cancelled_by_tutor: u64,
}

/// Minimal booking projection used to derive [`BookingOutcomeCounts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub status: BookingStatus,
    pub cancelled_by: Option<CancelledBy>,
}

impl BookingOutcomeCounts {
    /// Count bookings the way the trust engine expects them.
    ///
    /// A cancelled booking with no recorded initiator is not charged to the tutor.
    pub fn tally<'a, I>(bookings: I) -> Self
    where
        I: IntoIterator<Item = &'a BookingSummary>,
    {
        bookings
            .into_iter()
            .fold(Self::default(), |mut counts, booking| {
                counts.total += 1;
                match booking.status {
                    BookingStatus::Completed => counts.completed += 1,
                    BookingStatus::Cancelled
                        if booking.cancelled_by == Some(CancelledBy::Tutor) =>
                    {
                        counts.cancelled_by_tutor += 1
                    }
                    _ => {}
                }
                counts
            })
    }
}

/// `clamp(50 + 2 × completed − 5 × cancelled, 0, 100)`, computed in floating point so very
/// large counts saturate at the bounds instead of overflowing.
pub fn trust_score(completed: u64, cancelled_by_tutor: u64) -> f64 {
    let raw = BASE_SCORE + completed as f64 * COMPLETION_REWARD
        - cancelled_by_tutor as f64 * CANCELLATION_PENALTY;
    raw.clamp(MIN_SCORE, MAX_SCORE)
}
