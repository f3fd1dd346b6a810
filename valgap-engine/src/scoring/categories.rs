//! Category Score Aggregator.
//!
//! Turns raw assessment responses into per-category readiness scores and a
//! weighted composite.
//!
//! 1. Deduplicate by question id, keeping the most recently updated response
//!    (ties keep the earlier one in iteration order, so callers pass responses
//!    sorted newest-first).
//! 2. Per category: `score = Σ(maxPoints × scoreValue) / Σ(maxPoints)`. Categories
//!    with no points are absent from the result, not zero.
//! 3. Composite: `Σ score_i × weight_i` with weights renormalized to sum to 1.

use std::collections::{BTreeMap, HashMap};

use valgap_common::config::CategoryWeights;

use crate::error::{EngineError, EngineResult};
use crate::types::{AssessmentResponse, CategoryScore, ReadinessCategory};

/// Keep one response per question id.
pub fn dedupe_responses(responses: &[AssessmentResponse]) -> Vec<&AssessmentResponse> {
    let mut kept: Vec<&AssessmentResponse> = Vec::new();
    let mut index_by_question: HashMap<&str, usize> = HashMap::new();

    for response in responses {
        match index_by_question.get(response.question_id.as_str()) {
            Some(&idx) => {
                if response.updated_at > kept[idx].updated_at {
                    kept[idx] = response;
                }
            }
            None => {
                index_by_question.insert(response.question_id.as_str(), kept.len());
                kept.push(response);
            }
        }
    }

    kept
}

/// Score every category that has at least one answered, positively weighted question.
pub fn score_categories(
    responses: &[AssessmentResponse],
    weights: &CategoryWeights,
) -> EngineResult<Vec<CategoryScore>> {
    if responses.is_empty() {
        return Err(EngineError::NoAssessmentResponses);
    }

    // (earned, total) per category
    let mut totals: BTreeMap<ReadinessCategory, (f64, f64)> = BTreeMap::new();
    for response in dedupe_responses(responses) {
        let Some(value) = response.score_value else {
            continue;
        };
        if !value.is_finite() || !response.max_points.is_finite() || response.max_points <= 0.0 {
            continue;
        }
        let entry = totals.entry(response.category).or_insert((0.0, 0.0));
        entry.0 += response.max_points * value.clamp(0.0, 1.0);
        entry.1 += response.max_points;
    }

    if totals.is_empty() {
        return Err(EngineError::NoAssessmentResponses);
    }

    let raw: Vec<(ReadinessCategory, f64)> = totals
        .keys()
        .map(|c| (*c, c.raw_weight(weights).max(0.0)))
        .collect();
    let normalized = normalize_weights(&raw);

    let scores = totals
        .into_iter()
        .map(|(category, (earned, total))| CategoryScore {
            category,
            earned_points: earned,
            total_points: total,
            score: (earned / total).clamp(0.0, 1.0),
            weight: normalized.get(&category).copied().unwrap_or(0.0),
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        categories = scores.len(),
        "Scored readiness categories"
    );

    Ok(scores)
}

/// Renormalize weights so they sum to exactly 1. All-zero weights become equal weights.
fn normalize_weights(raw: &[(ReadinessCategory, f64)]) -> HashMap<ReadinessCategory, f64> {
    let sum: f64 = raw.iter().map(|(_, w)| w).sum();
    if sum <= 0.0 {
        let equal = 1.0 / raw.len().max(1) as f64;
        return raw.iter().map(|(c, _)| (*c, equal)).collect();
    }
    raw.iter().map(|(c, w)| (*c, w / sum)).collect()
}

/// Weighted composite readiness score in [0, 1].
pub fn composite_score(scores: &[CategoryScore]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let raw: Vec<(ReadinessCategory, f64)> = scores
        .iter()
        .map(|s| (s.category, s.weight.max(0.0)))
        .collect();
    let weights = normalize_weights(&raw);

    scores
        .iter()
        .map(|s| s.score * weights.get(&s.category).copied().unwrap_or(0.0))
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn response(
        question: &str,
        category: ReadinessCategory,
        max_points: f64,
        value: Option<f64>,
        minutes: i64,
    ) -> AssessmentResponse {
        AssessmentResponse {
            question_id: question.to_string(),
            category,
            max_points,
            score_value: value,
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_dedupe_keeps_newest() {
        let responses = vec![
            response("q1", ReadinessCategory::Financial, 10.0, Some(1.0), 5),
            response("q1", ReadinessCategory::Financial, 10.0, Some(0.0), 1),
            response("q2", ReadinessCategory::Market, 5.0, Some(0.5), 2),
        ];
        let kept = dedupe_responses(&responses);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score_value, Some(1.0));
    }

    #[test]
    fn test_dedupe_tie_keeps_first() {
        let responses = vec![
            response("q1", ReadinessCategory::Financial, 10.0, Some(0.2), 3),
            response("q1", ReadinessCategory::Financial, 10.0, Some(0.9), 3),
        ];
        let kept = dedupe_responses(&responses);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score_value, Some(0.2));
    }

    #[test]
    fn test_dedupe_later_but_newer_wins() {
        let responses = vec![
            response("q1", ReadinessCategory::Financial, 10.0, Some(0.2), 1),
            response("q1", ReadinessCategory::Financial, 10.0, Some(0.9), 8),
        ];
        let kept = dedupe_responses(&responses);
        assert_eq!(kept[0].score_value, Some(0.9));
    }

    #[test]
    fn test_category_scores_are_point_weighted() {
        let responses = vec![
            response("q1", ReadinessCategory::Financial, 10.0, Some(1.0), 0),
            response("q2", ReadinessCategory::Financial, 30.0, Some(0.5), 0),
            response("q3", ReadinessCategory::Market, 5.0, Some(0.0), 0),
        ];
        let scores = score_categories(&responses, &CategoryWeights::default()).unwrap();
        assert_eq!(scores.len(), 2);

        let financial = &scores[0];
        assert_eq!(financial.category, ReadinessCategory::Financial);
        assert!((financial.earned_points - 25.0).abs() < 1e-12);
        assert!((financial.total_points - 40.0).abs() < 1e-12);
        assert!((financial.score - 0.625).abs() < 1e-12);

        // Weights renormalized over the two present categories: 0.25 / 0.40, 0.15 / 0.40
        assert!((financial.weight - 0.625).abs() < 1e-12);
        assert!((scores[1].weight - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_unanswered_categories_are_absent() {
        let responses = vec![
            response("q1", ReadinessCategory::Financial, 10.0, Some(1.0), 0),
            response("q2", ReadinessCategory::Personal, 10.0, None, 0),
            response("q3", ReadinessCategory::Market, 0.0, Some(1.0), 0),
        ];
        let scores = score_categories(&responses, &CategoryWeights::default()).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].category, ReadinessCategory::Financial);
    }

    #[test]
    fn test_no_responses() {
        let err = score_categories(&[], &CategoryWeights::default()).unwrap_err();
        assert_eq!(err.reason_code(), "no_assessment_responses");

        let unanswered = vec![response("q1", ReadinessCategory::Financial, 10.0, None, 0)];
        assert_eq!(
            score_categories(&unanswered, &CategoryWeights::default()),
            Err(EngineError::NoAssessmentResponses)
        );
    }

    #[test]
    fn test_composite_score() {
        let responses = vec![
            response("q1", ReadinessCategory::Financial, 10.0, Some(0.8), 0),
            response("q2", ReadinessCategory::Transferability, 10.0, Some(0.4), 0),
        ];
        let scores = score_categories(&responses, &CategoryWeights::default()).unwrap();
        // weights 0.25 / 0.45 and 0.20 / 0.45
        let expected = 0.8 * (0.25 / 0.45) + 0.4 * (0.20 / 0.45);
        assert!((composite_score(&scores) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_composite_with_unnormalized_weights() {
        let scores = vec![
            CategoryScore {
                category: ReadinessCategory::Financial,
                earned_points: 1.0,
                total_points: 1.0,
                score: 1.0,
                weight: 3.0,
            },
            CategoryScore {
                category: ReadinessCategory::Market,
                earned_points: 0.0,
                total_points: 1.0,
                score: 0.0,
                weight: 1.0,
            },
        ];
        assert!((composite_score(&scores) - 0.75).abs() < 1e-12);
        assert_eq!(composite_score(&[]), 0.0);
    }

    #[test]
    fn test_scores_clamped() {
        let responses = vec![response("q1", ReadinessCategory::Operational, 10.0, Some(1.7), 0)];
        let scores = score_categories(&responses, &CategoryWeights::default()).unwrap();
        assert!((scores[0].score - 1.0).abs() < 1e-12);
        assert!((scores[0].weight - 1.0).abs() < 1e-12);
    }
}
