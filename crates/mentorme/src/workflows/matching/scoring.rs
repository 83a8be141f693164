use serde::{Deserialize, Serialize};

use super::domain::{ClassOffering, MatchRequest, PriceBand, TutorCandidate};

pub const TRUST_WEIGHT: f64 = 0.5;
pub const RATING_WEIGHT: f64 = 10.0;
pub const COMPLETION_WEIGHT: f64 = 2.0;
pub const SUBJECT_MATCH_BONUS: f64 = 6.0;
pub const GRADE_MATCH_BONUS: f64 = 4.0;

/// Per-term contributions to a match score, kept for audits.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub trust: f64,
    pub rating: f64,
    pub completions: f64,
    pub subject_match: bool,
    pub grade_match: bool,
    pub price_penalty: f64,
    pub slot_bonus: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        let subject = if self.subject_match { SUBJECT_MATCH_BONUS } else { 0.0 };
        let grade = if self.grade_match { GRADE_MATCH_BONUS } else { 0.0 };
        self.trust + self.rating + self.completions + subject + grade + self.slot_bonus
            - self.price_penalty
    }
}

/// Score `candidate` against `request`; `slot_bonus` comes from the slot extension point.
pub fn score_candidate(
    candidate: &TutorCandidate,
    request: &MatchRequest,
    slot_bonus: f64,
) -> ScoreBreakdown {
    ScoreBreakdown {
        trust: candidate.trust_score * TRUST_WEIGHT,
        rating: candidate.average_rating * RATING_WEIGHT,
        completions: candidate.total_completed_bookings as f64 * COMPLETION_WEIGHT,
        subject_match: subject_match(&candidate.offerings, request.subject_id.as_deref()),
        grade_match: grade_match(&candidate.offerings, request.grade_level.as_deref()),
        price_penalty: price_penalty(&candidate.offerings, request.price_band.as_ref()),
        slot_bonus,
    }
}

pub fn subject_match(offerings: &[ClassOffering], subject_id: Option<&str>) -> bool {
    let Some(subject_id) = subject_id else {
        return false;
    };
    offerings
        .iter()
        .any(|offering| offering.is_published() && offering.subject_id == subject_id)
}

/// Case-insensitive substring match of the requested grade inside a published offering's
/// target-grade text.
pub fn grade_match(offerings: &[ClassOffering], grade_level: Option<&str>) -> bool {
    let Some(wanted) = grade_level
        .map(|grade| grade.trim().to_lowercase())
        .filter(|grade| !grade.is_empty())
    else {
        return false;
    };

    offerings.iter().filter(|offering| offering.is_published()).any(|offering| {
        offering
            .target_grade
            .as_deref()
            .is_some_and(|target| target.to_lowercase().contains(&wanted))
    })
}

/// The priced offering closest to `band`; the first one wins on equal distance.
pub fn closest_price(offerings: &[ClassOffering], band: &PriceBand) -> Option<f64> {
    offerings
        .iter()
        .filter_map(|offering| offering.price_per_hour)
        .fold(None, |closest: Option<f64>, price| match closest {
            Some(current) if band.overshoot(current) <= band.overshoot(price) => Some(current),
            _ => Some(price),
        })
}

pub fn price_penalty(offerings: &[ClassOffering], band: Option<&PriceBand>) -> f64 {
    match band {
        Some(band) if !band.is_unbounded() => closest_price(offerings, band)
            .map(|price| band.overshoot(price))
            .unwrap_or(0.0),
        _ => 0.0,
    }
}
