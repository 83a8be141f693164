use tracing::debug;

use super::domain::{MatchCandidate, MatchRequest, TimeSlot, TutorCandidate};
use super::scoring::score_candidate;

/// Hook for weighting a candidate's availability against the requested slots.
pub trait SlotPreferenceScorer: Send + Sync {
    fn slot_bonus(&self, candidate: &TutorCandidate, desired: &[TimeSlot]) -> f64;
}

/// Default slot policy: slots are accepted but do not move the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreSlotPreferences;

impl SlotPreferenceScorer for IgnoreSlotPreferences {
    fn slot_bonus(&self, _candidate: &TutorCandidate, _desired: &[TimeSlot]) -> f64 {
        0.0
    }
}

/// Stateless ranker applying the weighted score formula to a pre-filtered candidate set.
pub struct MatchingEngine {
    slots: Box<dyn SlotPreferenceScorer>,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new(Box::new(IgnoreSlotPreferences))
    }
}

impl MatchingEngine {
    pub fn new(slots: Box<dyn SlotPreferenceScorer>) -> Self {
        Self { slots }
    }

    /// Score every candidate, order by descending score and keep at most `request.limit`.
    /// A zero limit is read as one. Equal scores keep their input order.
    pub fn rank(
        &self,
        candidates: Vec<TutorCandidate>,
        request: &MatchRequest,
    ) -> Vec<MatchCandidate> {
        let considered = candidates.len();
        let mut ranked: Vec<MatchCandidate> = candidates
            .into_iter()
            .map(|tutor| {
                let slot_bonus = self.slots.slot_bonus(&tutor, &request.desired_slots);
                let breakdown = score_candidate(&tutor, request, slot_bonus);
                MatchCandidate {
                    match_score: breakdown.total(),
                    breakdown,
                    tutor,
                }
            })
            .collect();

        ranked.sort_by(|left, right| right.match_score.total_cmp(&left.match_score));
        ranked.truncate(request.limit.max(1));

        debug!(
            considered,
            returned = ranked.len(),
            top_score = ranked.first().map(|candidate| candidate.match_score),
            "candidates ranked"
        );
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::domain::{ClassId, TutorId, UserId};
    use crate::workflows::matching::domain::{ClassOffering, OfferingStatus, PriceBand};

    fn tutor(id: &str, trust: f64, rating: f64, completed: u64, price: f64) -> TutorCandidate {
        TutorCandidate {
            tutor_id: TutorId(id.to_string()),
            user_id: UserId(format!("user-{id}")),
            bio: None,
            city: None,
            district: None,
            national_id_number: None,
            trust_score: trust,
            average_rating: rating,
            total_completed_bookings: completed,
            offerings: vec![ClassOffering {
                class_id: ClassId(format!("class-{id}")),
                subject_id: "math".to_string(),
                target_grade: Some("Grade 10".to_string()),
                price_per_hour: Some(price),
                status: OfferingStatus::Published,
            }],
        }
    }

    fn request(limit: usize) -> MatchRequest {
        MatchRequest {
            subject_id: Some("math".to_string()),
            grade_level: Some("grade 10".to_string()),
            price_band: Some(PriceBand::new(Some(100.0), Some(200.0))),
            desired_slots: Vec::new(),
            limit,
        }
    }

    fn ids(ranked: &[MatchCandidate]) -> Vec<&str> {
        ranked
            .iter()
            .map(|candidate| candidate.tutor.tutor_id.0.as_str())
            .collect()
    }

    #[test]
    fn ranks_in_descending_score_order() {
        let candidates = vec![
            tutor("low-trust-exact-price", 40.0, 4.0, 5, 150.0),
            tutor("veteran-overpriced", 90.0, 4.8, 30, 260.0),
            tutor("newcomer", 50.0, 3.0, 0, 120.0),
        ];

        let ranked = MatchingEngine::default().rank(candidates, &request(10));

        // 45 + 48 + 60 + 10 - 60 = 103; 20 + 40 + 10 + 10 = 80; 25 + 30 + 10 = 65
        assert_eq!(
            ids(&ranked),
            vec!["veteran-overpriced", "low-trust-exact-price", "newcomer"]
        );
        assert_eq!(ranked[0].match_score, 103.0);
        assert_eq!(ranked[0].breakdown.price_penalty, 60.0);
        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].match_score >= pair[1].match_score));
    }

    #[test]
    fn truncates_to_limit_with_a_floor_of_one() {
        let candidates = || {
            vec![
                tutor("a", 60.0, 4.0, 1, 150.0),
                tutor("b", 70.0, 4.0, 1, 150.0),
                tutor("c", 80.0, 4.0, 1, 150.0),
            ]
        };
        let engine = MatchingEngine::default();

        assert_eq!(ids(&engine.rank(candidates(), &request(2))), vec!["c", "b"]);
        assert_eq!(ids(&engine.rank(candidates(), &request(0))), vec!["c"]);
        assert_eq!(engine.rank(candidates(), &request(10)).len(), 3);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let candidates = vec![
            tutor("first", 60.0, 4.0, 2, 150.0),
            tutor("second", 60.0, 4.0, 2, 150.0),
            tutor("third", 60.0, 4.0, 2, 150.0),
        ];

        let ranked = MatchingEngine::default().rank(candidates, &request(10));
        assert_eq!(ids(&ranked), vec!["first", "second", "third"]);
    }

    struct WeekendBonus;

    impl SlotPreferenceScorer for WeekendBonus {
        fn slot_bonus(&self, candidate: &TutorCandidate, desired: &[TimeSlot]) -> f64 {
            let wants_sunday = desired.iter().any(|slot| slot.day_of_week == 0);
            if wants_sunday && candidate.tutor_id.0 == "weekend" {
                200.0
            } else {
                0.0
            }
        }
    }

    #[test]
    fn slot_scorer_feeds_the_total() {
        let mut sunday_request = request(10);
        sunday_request.desired_slots.push(TimeSlot {
            day_of_week: 0,
            start_minute: 540,
            end_minute: 660,
        });
        let candidates = vec![
            tutor("weekday", 90.0, 5.0, 40, 150.0),
            tutor("weekend", 10.0, 1.0, 0, 150.0),
        ];

        let ranked = MatchingEngine::new(Box::new(WeekendBonus)).rank(candidates, &sunday_request);

        assert_eq!(ids(&ranked), vec!["weekend", "weekday"]);
        assert_eq!(ranked[0].breakdown.slot_bonus, 200.0);
        assert_eq!(ranked[0].match_score, 225.0);
        assert_eq!(ranked[1].match_score, 185.0);
    }
}
