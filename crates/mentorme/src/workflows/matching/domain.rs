use serde::{Deserialize, Serialize};

use super::scoring::ScoreBreakdown;
use crate::workflows::domain::{ClassId, TutorId, UserId};

/// Publication state of a class offering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferingStatus {
    Draft,
    Published,
    Archived,
}

/// A class a tutor advertises; the unit subject, grade and price matching look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassOffering {
    pub class_id: ClassId,
    pub subject_id: String,
    /// Free text such as "Grade 9-10" or "Lop 12".
    pub target_grade: Option<String>,
    pub price_per_hour: Option<f64>,
    pub status: OfferingStatus,
}

impl ClassOffering {
    pub fn is_published(&self) -> bool {
        self.status == OfferingStatus::Published
    }
}

/// Tutor profile as handed over by the candidate supplier, hard filters already applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorCandidate {
    pub tutor_id: TutorId,
    pub user_id: UserId,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub national_id_number: Option<String>,
    pub trust_score: f64,
    pub average_rating: f64,
    pub total_completed_bookings: u64,
    pub offerings: Vec<ClassOffering>,
}

/// Requested hourly price range; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceBand {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceBand {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// True when neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// How far `price` falls outside the band; zero inside it.
    pub fn overshoot(&self, price: f64) -> f64 {
        match (self.min, self.max) {
            (Some(min), _) if price < min => min - price,
            (_, Some(max)) if price > max => price - max,
            _ => 0.0,
        }
    }
}

/// Weekly availability slot, minutes counted from midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// 0 = Sunday through 6 = Saturday.
    pub day_of_week: u8,
    pub start_minute: u16,
    pub end_minute: u16,
}

impl TimeSlot {
    pub fn is_valid(&self) -> bool {
        self.day_of_week <= 6 && self.start_minute < self.end_minute && self.end_minute <= 1440
    }
}

/// Soft criteria the ranking engine scores candidates against.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchRequest {
    pub subject_id: Option<String>,
    pub grade_level: Option<String>,
    pub price_band: Option<PriceBand>,
    pub desired_slots: Vec<TimeSlot>,
    pub limit: usize,
}

/// A candidate paired with its score for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub tutor: TutorCandidate,
    pub match_score: f64,
    pub breakdown: ScoreBreakdown,
}
