//! Tutor reputation: a bounded trust score rebuilt from booking outcome counts.

pub mod repository;
pub mod router;
pub mod score;
pub mod service;

pub use repository::{TutorStats, TutorStatsRepository};
pub use router::trust_router;
pub use score::{trust_score, BookingOutcomeCounts, BookingSummary};
pub use service::{TrustScoreEngine, TrustScoreError, TutorStatsRecalculator};
