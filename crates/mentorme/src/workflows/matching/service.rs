use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{MatchCandidate, MatchRequest, PriceBand, TimeSlot, TutorCandidate};
use super::engine::MatchingEngine;
use crate::config::MatchingConfig;
use crate::workflows::domain::RepositoryError;

/// Storage seam returning verified tutors that pass the hard location filters.
pub trait CandidateSupplier: Send + Sync {
    fn candidates(&self, filter: &CandidateFilter) -> Result<Vec<TutorCandidate>, RepositoryError>;
}

/// Hard filters applied by the supplier before any scoring happens.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CandidateFilter {
    pub city: Option<String>,
    pub district: Option<String>,
}

/// Filter-style tutor search; every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorSearchFilter {
    pub subject_id: Option<String>,
    pub grade_level: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

/// Student-facing match request expressed as a budget rather than a price band.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingRequest {
    pub subject_id: String,
    pub grade_level: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    pub budget_per_hour: f64,
    #[serde(default)]
    pub desired_slots: Vec<TimeSlot>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Entry point for both search flavours; fetches candidates and delegates scoring to the
/// [`MatchingEngine`].
pub struct MatchingService<S> {
    supplier: Arc<S>,
    engine: MatchingEngine,
    config: MatchingConfig,
}

impl<S> MatchingService<S>
where
    S: CandidateSupplier + 'static,
{
    pub fn new(supplier: Arc<S>, engine: MatchingEngine, config: MatchingConfig) -> Self {
        Self {
            supplier,
            engine,
            config,
        }
    }

    pub fn search(&self, filter: &TutorSearchFilter) -> Result<Vec<MatchCandidate>, MatchingError> {
        let band = PriceBand::new(filter.price_min, filter.price_max);
        if let (Some(min), Some(max)) = (band.min, band.max) {
            if min > max {
                return Err(MatchingError::InvalidRequest(format!(
                    "price_min {min} exceeds price_max {max}"
                )));
            }
        }

        let request = MatchRequest {
            subject_id: non_blank(filter.subject_id.as_deref()),
            grade_level: non_blank(filter.grade_level.as_deref()),
            price_band: (!band.is_unbounded()).then_some(band),
            desired_slots: Vec::new(),
            limit: self.config.search_limit,
        };
        let location = CandidateFilter {
            city: non_blank(filter.city.as_deref()),
            district: non_blank(filter.district.as_deref()),
        };
        self.rank(&location, &request)
    }

    pub fn match_tutors(
        &self,
        request: &MatchingRequest,
    ) -> Result<Vec<MatchCandidate>, MatchingError> {
        let subject_id = non_blank(Some(request.subject_id.as_str()))
            .ok_or_else(|| MatchingError::InvalidRequest("subject_id is required".to_string()))?;
        let grade_level = non_blank(Some(request.grade_level.as_str()))
            .ok_or_else(|| MatchingError::InvalidRequest("grade_level is required".to_string()))?;
        if !(request.budget_per_hour.is_finite() && request.budget_per_hour > 0.0) {
            return Err(MatchingError::InvalidRequest(
                "budget_per_hour must be positive".to_string(),
            ));
        }
        if request.desired_slots.iter().any(|slot| !slot.is_valid()) {
            return Err(MatchingError::InvalidRequest(
                "desired_slots contains an invalid slot".to_string(),
            ));
        }
        let limit = request.limit.unwrap_or(self.config.default_limit);
        if limit == 0 {
            return Err(MatchingError::InvalidRequest(
                "limit must be at least 1".to_string(),
            ));
        }

        let ceiling = request.budget_per_hour * self.config.budget_tolerance;
        let scored = MatchRequest {
            subject_id: Some(subject_id),
            grade_level: Some(grade_level),
            price_band: Some(PriceBand::new(None, Some(ceiling))),
            desired_slots: request.desired_slots.clone(),
            limit: limit.min(self.config.search_limit),
        };
        let location = CandidateFilter {
            city: non_blank(request.city.as_deref()),
            district: non_blank(request.district.as_deref()),
        };
        debug!(
            subject_id = scored.subject_id.as_deref(),
            price_ceiling = ceiling,
            limit = scored.limit,
            "matching tutors for request"
        );
        self.rank(&location, &scored)
    }

    fn rank(
        &self,
        location: &CandidateFilter,
        request: &MatchRequest,
    ) -> Result<Vec<MatchCandidate>, MatchingError> {
        let candidates = self.supplier.candidates(location)?;
        Ok(self.engine.rank(candidates, request))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("invalid matching request: {0}")]
    InvalidRequest(String),
    #[error("candidate supplier failed: {0}")]
    Supplier(#[from] RepositoryError),
}

/// Fixed candidate list, handy for the demo and tests; remembers the last filter it saw.
#[derive(Debug, Default)]
pub struct StaticCandidates {
    candidates: Vec<TutorCandidate>,
    last_filter: Mutex<Option<CandidateFilter>>,
}

impl StaticCandidates {
    pub fn new(candidates: Vec<TutorCandidate>) -> Self {
        Self {
            candidates,
            last_filter: Mutex::new(None),
        }
    }

    pub fn last_filter(&self) -> Option<CandidateFilter> {
        self.last_filter
            .lock()
            .expect("candidate filter mutex poisoned")
            .clone()
    }
}

impl CandidateSupplier for StaticCandidates {
    fn candidates(&self, filter: &CandidateFilter) -> Result<Vec<TutorCandidate>, RepositoryError> {
        *self
            .last_filter
            .lock()
            .expect("candidate filter mutex poisoned") = Some(filter.clone());
        Ok(self
            .candidates
            .iter()
            .filter(|candidate| {
                filter
                    .city
                    .as_ref()
                    .map_or(true, |city| candidate.city.as_ref() == Some(city))
                    && filter
                        .district
                        .as_ref()
                        .map_or(true, |district| candidate.district.as_ref() == Some(district))
            })
            .cloned()
            .collect())
    }
}
