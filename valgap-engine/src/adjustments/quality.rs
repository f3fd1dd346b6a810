//! Multiple Adjustment Engine.
//!
//! Computes named percentage adjustments to the industry multiple from the
//! financial profile and folds them into one bounded multiplier:
//!
//! ```text
//! multiplier = clamp(1 + Σ impact_i, 0.3, 1.5)     (enabled adjustments only)
//! BQS        = (multiplier - 0.3) / 1.2
//! ```
//!
//! These adjustments move the company's *quality positioning* within its
//! industry range. Acquisition risk is handled separately and multiplicatively
//! in [`super::risk`].

use serde::{Deserialize, Serialize};

use crate::types::{FinancialProfile, RevenueModel, SizeCategory};

/// Lower bound of the adjustment multiplier.
pub const MIN_ADJUSTMENT_MULTIPLIER: f64 = 0.3;
/// Upper bound of the adjustment multiplier.
pub const MAX_ADJUSTMENT_MULTIPLIER: f64 = 1.5;

/// Owner-dependency discount at a Transferability score of zero.
const OWNER_DEPENDENCY_MAX_DISCOUNT: f64 = 0.25;
/// Adjustments smaller than this are dropped.
const MIN_MATERIAL_IMPACT: f64 = 0.02;

/// Flat premium when only the coarse recurring flag is known.
const RECURRING_FLAG_PREMIUM: f64 = 0.15;

// (minimum growth rate, impact)
const GROWTH_TIERS: &[(f64, f64)] = &[
    (0.30, 0.20),
    (0.20, 0.12),
    (0.10, 0.06),
    (0.0, 0.0),
    (-0.10, -0.10),
];
const GROWTH_FLOOR_IMPACT: f64 = -0.20;

// (minimum EBITDA margin, impact)
const MARGIN_TIERS: &[(f64, f64)] = &[(0.30, 0.15), (0.20, 0.08), (0.10, 0.0), (0.0, -0.10)];
const NEGATIVE_MARGIN_IMPACT: f64 = -0.25;

/// Single-customer concentration: (threshold, impact). First tier is the high tier.
const TOP_CUSTOMER_TIERS: &[(f64, f64)] = &[(0.30, -0.20), (0.20, -0.10)];
/// Top-3 concentration: (threshold, impact).
const TOP3_CUSTOMER_TIERS: &[(f64, f64)] = &[(0.60, -0.15), (0.40, -0.08)];

// ============================================================================
// Adjustment Types
// ============================================================================

/// Identifier of an adjustment factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentFactor {
    Size,
    Growth,
    Margin,
    TopCustomerConcentration,
    Top3CustomerConcentration,
    OwnerDependency,
    RevenueQuality,
}

impl AdjustmentFactor {
    pub const ALL: [AdjustmentFactor; 7] = [
        Self::Size,
        Self::Growth,
        Self::Margin,
        Self::TopCustomerConcentration,
        Self::Top3CustomerConcentration,
        Self::OwnerDependency,
        Self::RevenueQuality,
    ];

    /// Stable id, also used for the `disabled_adjustments` configuration list.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Growth => "growth",
            Self::Margin => "margin",
            Self::TopCustomerConcentration => "top_customer_concentration",
            Self::Top3CustomerConcentration => "top3_customer_concentration",
            Self::OwnerDependency => "owner_dependency",
            Self::RevenueQuality => "revenue_quality",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL.into_iter().find(|f| f.id().eq_ignore_ascii_case(id))
    }

    /// Parse a list of configured ids, ignoring unknown ones.
    pub fn parse_list(ids: &[String]) -> Vec<Self> {
        ids.iter().filter_map(|id| Self::from_id(id)).collect()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Size => "Size Discount",
            Self::Growth => "Growth Adjustment",
            Self::Margin => "Margin Adjustment",
            Self::TopCustomerConcentration => "Customer Concentration",
            Self::Top3CustomerConcentration => "Top-3 Customer Concentration",
            Self::OwnerDependency => "Owner Dependency",
            Self::RevenueQuality => "Recurring Revenue",
        }
    }

    pub fn category(&self) -> AdjustmentCategory {
        match self {
            Self::Size => AdjustmentCategory::Structural,
            Self::Growth | Self::Margin => AdjustmentCategory::Performance,
            Self::TopCustomerConcentration | Self::Top3CustomerConcentration => {
                AdjustmentCategory::Customer
            }
            Self::OwnerDependency => AdjustmentCategory::Transferability,
            Self::RevenueQuality => AdjustmentCategory::RevenueQuality,
        }
    }
}

/// Grouping tag for an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentCategory {
    /// Cannot be changed without changing the company's scale
    Structural,
    Performance,
    Customer,
    Transferability,
    RevenueQuality,
}

/// One named adjustment to the multiple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleAdjustment {
    pub factor: AdjustmentFactor,
    pub name: String,
    /// Signed decimal impact (-0.10 = -10%)
    pub impact: f64,
    pub explanation: String,
    pub enabled: bool,
    pub category: AdjustmentCategory,
}

/// The adjustment bundle and its folded multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentResult {
    pub adjustments: Vec<MultipleAdjustment>,
    /// Sum of enabled impacts
    pub total_adjustment: f64,
    /// clamp(1 + total, 0.3, 1.5)
    pub adjustment_multiplier: f64,
}

impl AdjustmentResult {
    /// Business Quality Score in [0, 1].
    pub fn business_quality_score(&self) -> f64 {
        business_quality_score(self.adjustment_multiplier)
    }

    /// Impact of an enabled adjustment, if present.
    pub fn impact_of(&self, factor: AdjustmentFactor) -> Option<f64> {
        self.adjustments
            .iter()
            .find(|a| a.factor == factor && a.enabled)
            .map(|a| a.impact)
    }
}

/// Normalize an adjustment multiplier into a 0-1 quality score.
pub fn business_quality_score(multiplier: f64) -> f64 {
    ((multiplier - MIN_ADJUSTMENT_MULTIPLIER)
        / (MAX_ADJUSTMENT_MULTIPLIER - MIN_ADJUSTMENT_MULTIPLIER))
        .clamp(0.0, 1.0)
}

// ============================================================================
// Individual Adjustments
// ============================================================================

/// Size discount for a revenue band.
pub fn size_discount(size: SizeCategory) -> f64 {
    match size {
        SizeCategory::UnderHalfMillion => -0.35,
        SizeCategory::HalfToOneMillion => -0.25,
        SizeCategory::OneToThreeMillion => -0.18,
        SizeCategory::ThreeToTenMillion => -0.10,
        SizeCategory::TenToTwentyFiveMillion => -0.05,
        SizeCategory::OverTwentyFiveMillion => 0.0,
    }
}

fn tiered(value: f64, tiers: &[(f64, f64)], floor: f64) -> f64 {
    tiers
        .iter()
        .find(|(threshold, _)| value >= *threshold)
        .map_or(floor, |(_, impact)| *impact)
}

fn pct(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

struct Builder {
    disabled: Vec<AdjustmentFactor>,
    adjustments: Vec<MultipleAdjustment>,
}

impl Builder {
    fn push(&mut self, factor: AdjustmentFactor, impact: f64, explanation: String) {
        self.adjustments.push(MultipleAdjustment {
            factor,
            name: factor.display_name().to_string(),
            impact,
            explanation,
            enabled: !self.disabled.contains(&factor),
            category: factor.category(),
        });
    }
}

/// Compute all adjustments for a profile.
///
/// `transferability_score` is the readiness Transferability category score, if
/// the company has one. Factors listed in `disabled` are reported with
/// `enabled = false` and left out of the multiplier.
pub fn compute_adjustments(
    profile: &FinancialProfile,
    transferability_score: Option<f64>,
    disabled: &[AdjustmentFactor],
) -> AdjustmentResult {
    let mut builder = Builder {
        disabled: disabled.to_vec(),
        adjustments: Vec::new(),
    };

    // Size
    if let Some(size) = profile.size_tier() {
        let impact = size_discount(size);
        let explanation = if impact < 0.0 {
            format!(
                "Businesses with revenue {} trade at a {} discount to the industry range",
                size.label(),
                pct(-impact)
            )
        } else {
            format!("Revenue {} carries no size discount", size.label())
        };
        builder.push(AdjustmentFactor::Size, impact, explanation);
    }

    // Growth
    if let Some(growth) = profile.revenue_growth_rate.filter(|g| g.is_finite()) {
        let impact = tiered(growth, GROWTH_TIERS, GROWTH_FLOOR_IMPACT);
        builder.push(
            AdjustmentFactor::Growth,
            impact,
            format!(
                "Year-over-year revenue growth of {} adjusts the multiple by {}",
                pct(growth),
                pct(impact)
            ),
        );
    }

    // Margin
    if let Some(margin) = profile.effective_ebitda_margin().filter(|m| m.is_finite()) {
        let impact = tiered(margin, MARGIN_TIERS, NEGATIVE_MARGIN_IMPACT);
        builder.push(
            AdjustmentFactor::Margin,
            impact,
            format!("EBITDA margin of {} adjusts the multiple by {}", pct(margin), pct(impact)),
        );
    }

    // Customer concentration; a high single-customer tier suppresses the top-3 discount
    let mut single_customer_high = false;
    if let Some(top) = profile.top_customer_concentration {
        if let Some((idx, (_, impact))) = TOP_CUSTOMER_TIERS
            .iter()
            .enumerate()
            .find(|(_, (threshold, _))| top >= *threshold)
        {
            single_customer_high = idx == 0;
            builder.push(
                AdjustmentFactor::TopCustomerConcentration,
                *impact,
                format!("Largest customer accounts for {} of revenue", pct(top)),
            );
        }
    }
    if let Some(top3) = profile.top3_customer_concentration {
        if !single_customer_high {
            if let Some((_, impact)) = TOP3_CUSTOMER_TIERS
                .iter()
                .find(|(threshold, _)| top3 >= *threshold)
            {
                builder.push(
                    AdjustmentFactor::Top3CustomerConcentration,
                    *impact,
                    format!("Top three customers account for {} of revenue", pct(top3)),
                );
            }
        }
    }

    // Owner dependency
    if let Some(transferability) = transferability_score {
        let transferability = transferability.clamp(0.0, 1.0);
        let impact = -OWNER_DEPENDENCY_MAX_DISCOUNT * (1.0 - transferability);
        if impact.abs() >= MIN_MATERIAL_IMPACT {
            builder.push(
                AdjustmentFactor::OwnerDependency,
                impact,
                format!(
                    "Transferability score of {} implies buyers discount for owner dependency",
                    pct(transferability)
                ),
            );
        }
    }

    // Revenue quality
    match profile.revenue_model {
        Some(model) => {
            let impact = match model {
                RevenueModel::Subscription => Some(0.25),
                RevenueModel::RecurringContracts => Some(0.12),
                RevenueModel::ProjectBased => Some(-0.05),
                RevenueModel::Transactional => None,
            };
            if let Some(impact) = impact {
                builder.push(
                    AdjustmentFactor::RevenueQuality,
                    impact,
                    format!("{} revenue adjusts the multiple by {}", model, pct(impact)),
                );
            }
        }
        None => {
            if profile.is_recurring == Some(true) {
                builder.push(
                    AdjustmentFactor::RevenueQuality,
                    RECURRING_FLAG_PREMIUM,
                    "Recurring revenue earns a premium".to_string(),
                );
            }
        }
    }

    let total_adjustment: f64 = builder
        .adjustments
        .iter()
        .filter(|a| a.enabled)
        .map(|a| a.impact)
        .sum();
    let adjustment_multiplier =
        (1.0 + total_adjustment).clamp(MIN_ADJUSTMENT_MULTIPLIER, MAX_ADJUSTMENT_MULTIPLIER);

    tracing::debug!(
        adjustments = builder.adjustments.len(),
        total_adjustment,
        adjustment_multiplier,
        "Computed multiple adjustments"
    );

    AdjustmentResult {
        adjustments: builder.adjustments,
        total_adjustment,
        adjustment_multiplier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn profile() -> FinancialProfile {
        FinancialProfile {
            revenue: 5_000_000.0,
            ebitda: 750_000.0,
            ..Default::default()
        }
    }

    fn impact(result: &AdjustmentResult, factor: AdjustmentFactor) -> Option<f64> {
        result.impact_of(factor)
    }

    #[test]
    fn test_size_inferred_from_revenue() {
        let result = compute_adjustments(&profile(), None, &[]);
        assert_eq!(impact(&result, AdjustmentFactor::Size), Some(-0.10));

        let small = FinancialProfile {
            revenue: 300_000.0,
            ..Default::default()
        };
        let result = compute_adjustments(&small, None, &[]);
        assert_eq!(impact(&result, AdjustmentFactor::Size), Some(-0.35));
    }

    #[test]
    fn test_growth_tiers() {
        let cases = [
            (0.35, 0.20),
            (0.30, 0.20),
            (0.25, 0.12),
            (0.12, 0.06),
            (0.05, 0.0),
            (-0.05, -0.10),
            (-0.25, -0.20),
        ];
        for (growth, expected) in cases {
            let mut p = profile();
            p.revenue_growth_rate = Some(growth);
            let result = compute_adjustments(&p, None, &[]);
            assert_eq!(
                impact(&result, AdjustmentFactor::Growth),
                Some(expected),
                "growth {}",
                growth
            );
        }
        assert_eq!(impact(&compute_adjustments(&profile(), None, &[]), AdjustmentFactor::Growth), None);
    }

    #[test]
    fn test_margin_tiers() {
        let cases = [(0.35, 0.15), (0.22, 0.08), (0.15, 0.0), (0.05, -0.10), (-0.02, -0.25)];
        for (margin, expected) in cases {
            let mut p = profile();
            p.ebitda_margin = Some(margin);
            let result = compute_adjustments(&p, None, &[]);
            assert_eq!(impact(&result, AdjustmentFactor::Margin), Some(expected));
        }
        // Derived margin: 750K / 5M = 15%
        let result = compute_adjustments(&profile(), None, &[]);
        assert_eq!(impact(&result, AdjustmentFactor::Margin), Some(0.0));
    }

    #[test]
    fn test_concentration_suppression() {
        let mut p = profile();
        p.top_customer_concentration = Some(0.35);
        p.top3_customer_concentration = Some(0.70);
        let result = compute_adjustments(&p, None, &[]);
        assert_eq!(impact(&result, AdjustmentFactor::TopCustomerConcentration), Some(-0.20));
        assert_eq!(impact(&result, AdjustmentFactor::Top3CustomerConcentration), None);

        p.top_customer_concentration = Some(0.22);
        let result = compute_adjustments(&p, None, &[]);
        assert_eq!(impact(&result, AdjustmentFactor::TopCustomerConcentration), Some(-0.10));
        assert_eq!(impact(&result, AdjustmentFactor::Top3CustomerConcentration), Some(-0.15));

        p.top_customer_concentration = Some(0.10);
        p.top3_customer_concentration = Some(0.45);
        let result = compute_adjustments(&p, None, &[]);
        assert_eq!(impact(&result, AdjustmentFactor::TopCustomerConcentration), None);
        assert_eq!(impact(&result, AdjustmentFactor::Top3CustomerConcentration), Some(-0.08));
    }

    #[test]
    fn test_owner_dependency() {
        let result = compute_adjustments(&profile(), Some(0.4), &[]);
        let owner = impact(&result, AdjustmentFactor::OwnerDependency).unwrap();
        assert!((owner + 0.15).abs() < 1e-12);

        // |impact| = 0.25 * 0.05 = 0.0125 < 2% is dropped
        let result = compute_adjustments(&profile(), Some(0.95), &[]);
        assert_eq!(impact(&result, AdjustmentFactor::OwnerDependency), None);
    }

    #[test]
    fn test_revenue_quality() {
        let mut p = profile();
        p.revenue_model = Some(RevenueModel::Subscription);
        p.is_recurring = Some(true);
        let result = compute_adjustments(&p, None, &[]);
        assert_eq!(impact(&result, AdjustmentFactor::RevenueQuality), Some(0.25));

        p.revenue_model = Some(RevenueModel::ProjectBased);
        let result = compute_adjustments(&p, None, &[]);
        assert_eq!(impact(&result, AdjustmentFactor::RevenueQuality), Some(-0.05));

        p.revenue_model = None;
        let result = compute_adjustments(&p, None, &[]);
        assert_eq!(impact(&result, AdjustmentFactor::RevenueQuality), Some(0.15));

        p.revenue_model = Some(RevenueModel::Transactional);
        let result = compute_adjustments(&p, None, &[]);
        assert_eq!(impact(&result, AdjustmentFactor::RevenueQuality), None);
    }

    #[test]
    fn test_multiplier_and_bqs() {
        let mut p = profile();
        p.revenue_growth_rate = Some(0.25); // +12%
        p.revenue_model = Some(RevenueModel::RecurringContracts); // +12%
        // size -10%, margin 0%
        let result = compute_adjustments(&p, None, &[]);
        assert!((result.total_adjustment - 0.14).abs() < 1e-12);
        assert!((result.adjustment_multiplier - 1.14).abs() < 1e-12);
        assert!((result.business_quality_score() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_multiplier_clamped_low() {
        let p = FinancialProfile {
            revenue: 200_000.0,
            ebitda: -10_000.0,
            revenue_growth_rate: Some(-0.4),
            top_customer_concentration: Some(0.6),
            revenue_model: Some(RevenueModel::ProjectBased),
            ..Default::default()
        };
        let result = compute_adjustments(&p, Some(0.0), &[]);
        // -0.35 - 0.20 - 0.25 - 0.20 - 0.25 - 0.05
        assert!((result.total_adjustment + 1.30).abs() < 1e-12);
        assert_eq!(result.adjustment_multiplier, MIN_ADJUSTMENT_MULTIPLIER);
        assert_eq!(result.business_quality_score(), 0.0);
    }

    #[test]
    fn test_disabled_factor_reported_not_summed() {
        let mut p = profile();
        p.revenue_growth_rate = Some(0.4);
        let disabled = AdjustmentFactor::parse_list(&["GROWTH".to_string(), "nope".to_string()]);
        assert_eq!(disabled, vec![AdjustmentFactor::Growth]);

        let result = compute_adjustments(&p, None, &disabled);
        let growth = result
            .adjustments
            .iter()
            .find(|a| a.factor == AdjustmentFactor::Growth)
            .unwrap();
        assert!(!growth.enabled);
        assert_eq!(impact(&result, AdjustmentFactor::Growth), None);
        assert!((result.total_adjustment + 0.10).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_multiplier_bounded(
            revenue in 0.0f64..60_000_000.0,
            ebitda in -1_000_000.0f64..10_000_000.0,
            growth in prop::option::of(-1.0f64..2.0),
            top in prop::option::of(0.0f64..1.0),
            top3 in prop::option::of(0.0f64..1.0),
            transferability in prop::option::of(0.0f64..1.0),
            recurring in prop::option::of(any::<bool>()),
        ) {
            let p = FinancialProfile {
                revenue,
                ebitda,
                revenue_growth_rate: growth,
                top_customer_concentration: top,
                top3_customer_concentration: top3,
                is_recurring: recurring,
                ..Default::default()
            };
            let result = compute_adjustments(&p, transferability, &[]);
            prop_assert!(result.adjustment_multiplier >= MIN_ADJUSTMENT_MULTIPLIER);
            prop_assert!(result.adjustment_multiplier <= MAX_ADJUSTMENT_MULTIPLIER);
            let bqs = result.business_quality_score();
            prop_assert!((0.0..=1.0).contains(&bqs));
        }
    }
}
