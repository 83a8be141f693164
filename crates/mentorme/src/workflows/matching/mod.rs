//! Tutor discovery: weighted scoring and ranking of pre-filtered candidates.

pub mod domain;
pub mod engine;
pub mod router;
pub mod scoring;
pub mod service;

pub use domain::{
    ClassOffering, MatchCandidate, MatchRequest, OfferingStatus, PriceBand, TimeSlot,
    TutorCandidate,
};
pub use engine::{IgnoreSlotPreferences, MatchingEngine, SlotPreferenceScorer};
pub use router::{matching_router, TutorMatchView, TutorProfileView};
pub use scoring::ScoreBreakdown;
pub use service::{
    CandidateFilter, CandidateSupplier, MatchingError, MatchingRequest, MatchingService,
    StaticCandidates, TutorSearchFilter,
};
