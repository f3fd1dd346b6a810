//! Value Gap Decomposer.
//!
//! Splits the distance between the current canonical EV and the industry
//! ceiling into three components:
//!
//! | Component | Definition |
//! |-----------|------------|
//! | Addressable | EV at quality multiple × structural discounts only, minus current EV |
//! | Structural | EV at quality multiple (pre-risk), minus the addressable-free EV |
//! | Aspirational | EV at ceiling multiple × (1 + size discount), minus the pre-risk EV |
//!
//! Each component is floored at zero and rounded to whole currency units. Their
//! sum is the reported total gap. Because the quality and risk multipliers
//! interact multiplicatively the total need not equal the naive ceiling-minus-current
//! gap; both figures are reported.

use serde::{Deserialize, Serialize};

use crate::adjustments::{AdjustmentFactor, AdjustmentResult, RiskResult};
use crate::reference::MultipleRange;
use crate::types::{round_currency, CategoryScore, ReadinessCategory};
use crate::valuation::CanonicalValuation;

/// Addressable gap attributed to one readiness category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGap {
    pub category: ReadinessCategory,
    /// (1 - score) × weight
    pub raw_gap: f64,
    pub amount: f64,
}

/// Gap breakdown for one valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapDecomposition {
    pub current_value: f64,
    pub addressable_gap: f64,
    pub structural_gap: f64,
    pub aspirational_gap: f64,
    /// Sum of the three components
    pub total_gap: f64,
    /// Ceiling EV minus current EV, for comparison with `total_gap`
    pub naive_gap: f64,
    pub category_gaps: Vec<CategoryGap>,
}

impl GapDecomposition {
    /// Share of the total gap that remediation work can close.
    pub fn addressable_share(&self) -> f64 {
        if self.total_gap > 0.0 {
            self.addressable_gap / self.total_gap
        } else {
            0.0
        }
    }

    /// Category gaps, largest first.
    pub fn ranked_categories(&self) -> Vec<&CategoryGap> {
        let mut ranked: Vec<&CategoryGap> = self.category_gaps.iter().collect();
        ranked.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        ranked
    }
}

/// Decompose the gap for a canonical valuation.
pub fn decompose_gap(
    ebitda: f64,
    range: &MultipleRange,
    canonical: &CanonicalValuation,
    adjustments: &AdjustmentResult,
    risk: &RiskResult,
    category_scores: &[CategoryScore],
) -> GapDecomposition {
    if !ebitda.is_finite() || ebitda <= 0.0 {
        return GapDecomposition {
            current_value: 0.0,
            addressable_gap: 0.0,
            structural_gap: 0.0,
            aspirational_gap: 0.0,
            total_gap: 0.0,
            naive_gap: 0.0,
            category_gaps: attribute_gap(0.0, &raw_category_gaps(category_scores)),
        };
    }

    let current_ev = ebitda * canonical.risk_adjusted_multiple;
    let pre_risk_ev = ebitda * canonical.quality_adjusted_multiple;
    let structural_only_ev = pre_risk_ev * risk.structural_multiplier();
    let size_impact = adjustments
        .impact_of(AdjustmentFactor::Size)
        .unwrap_or(0.0);
    let ceiling_ev = ebitda * range.ebitda_high * (1.0 + size_impact);

    let component = |value: f64| round_currency(value.max(0.0));
    let addressable_gap = component(structural_only_ev - current_ev);
    let structural_gap = component(pre_risk_ev - structural_only_ev);
    let aspirational_gap = component(ceiling_ev - pre_risk_ev);
    let total_gap = addressable_gap + structural_gap + aspirational_gap;
    let naive_gap = component(ebitda * range.ebitda_high - current_ev);

    let category_gaps = attribute_gap(addressable_gap, &raw_category_gaps(category_scores));

    tracing::debug!(
        addressable_gap,
        structural_gap,
        aspirational_gap,
        total_gap,
        naive_gap,
        "Decomposed value gap"
    );

    GapDecomposition {
        current_value: round_currency(current_ev),
        addressable_gap,
        structural_gap,
        aspirational_gap,
        total_gap,
        naive_gap,
        category_gaps,
    }
}

/// `(1 - score) × weight` per scored category.
pub fn raw_category_gaps(scores: &[CategoryScore]) -> Vec<(ReadinessCategory, f64)> {
    scores
        .iter()
        .map(|s| (s.category, ((1.0 - s.score) * s.weight).max(0.0)))
        .collect()
}

/// Split `total` proportionally to the raw gaps.
///
/// Amounts are rounded to whole units and the rounding residual goes to the
/// category with the largest raw gap, so the amounts sum exactly to the rounded
/// total. With no raw gap at all every category gets zero.
pub fn attribute_gap(total: f64, raw: &[(ReadinessCategory, f64)]) -> Vec<CategoryGap> {
    let total = round_currency(total.max(0.0));
    let raw_sum: f64 = raw.iter().map(|(_, r)| r).sum();

    let mut gaps: Vec<CategoryGap> = raw
        .iter()
        .map(|(category, raw_gap)| CategoryGap {
            category: *category,
            raw_gap: *raw_gap,
            amount: if raw_sum > 0.0 {
                round_currency(total * raw_gap / raw_sum)
            } else {
                0.0
            },
        })
        .collect();

    if raw_sum > 0.0 {
        let residual = total - gaps.iter().map(|g| g.amount).sum::<f64>();
        if residual != 0.0 {
            if let Some(largest) = largest_index(gaps.iter().map(|g| g.raw_gap)) {
                gaps[largest].amount += residual;
            }
        }
    }
    gaps
}

/// Index of the first maximum.
fn largest_index(values: impl Iterator<Item = f64>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

// ============================================================================
// Task Values
// ============================================================================

/// Dollar value assigned to a remediation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskValue {
    pub task_id: String,
    pub value: f64,
}

/// Rescale task values so they sum to a new total gap.
///
/// Values scale proportionally and are rounded; the residual goes to the
/// largest task. When every existing value is zero the new total is split evenly.
pub fn renormalize_task_values(tasks: &[TaskValue], new_total_gap: f64) -> Vec<TaskValue> {
    if tasks.is_empty() {
        return Vec::new();
    }
    let target = round_currency(new_total_gap.max(0.0));
    let current: f64 = tasks.iter().map(|t| t.value.max(0.0)).sum();

    let mut rescaled: Vec<TaskValue> = tasks
        .iter()
        .map(|t| TaskValue {
            task_id: t.task_id.clone(),
            value: if current > 0.0 {
                round_currency(target * t.value.max(0.0) / current)
            } else {
                round_currency(target / tasks.len() as f64)
            },
        })
        .collect();

    let residual = target - rescaled.iter().map(|t| t.value).sum::<f64>();
    if residual != 0.0 {
        let weights = tasks.iter().map(|t| t.value.max(0.0));
        if let Some(largest) = largest_index(weights) {
            rescaled[largest].value += residual;
        }
    }

    tracing::debug!(tasks = tasks.len(), previous_total = current, new_total = target, "Renormalized task values");
    rescaled
}
