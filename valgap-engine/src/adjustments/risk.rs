//! Risk Discount Engine.
//!
//! A second, independent bundle of discounts describing acquisition risk. Unlike
//! the quality adjustments these compound multiplicatively:
//!
//! ```text
//! riskMultiplier    = Π (1 - rate_i)
//! riskSeverityScore = 1 - riskMultiplier
//! ```
//!
//! | Discount | Rule |
//! |----------|------|
//! | DLOM | by size band, 25% (micro) → 10% (largest); 18% if unknown |
//! | Key person | owner-involvement base rate modulated by Transferability, max 30% |
//! | Concentration | single ≥30% → 15%, ≥20% → 8%; top-3 ≥60% → 10%, ≥40% → 5% |
//! | Documentation | 5% when the Financial score is below 50% |
//! | Legal / tax | 8% when the Legal/Tax score is below 40% |

use serde::{Deserialize, Serialize};

use crate::scoring::OwnerInvolvement;
use crate::types::{FinancialProfile, SizeCategory};

/// DLOM when the size band is unknown.
pub const DEFAULT_DLOM: f64 = 0.18;
/// Cap on the modulated key-person rate.
pub const MAX_KEY_PERSON_RATE: f64 = 0.30;

const MIN_MATERIAL_RATE: f64 = 0.02;
const DOCUMENTATION_RATE: f64 = 0.05;
const DOCUMENTATION_THRESHOLD: f64 = 0.5;
const LEGAL_TAX_RATE: f64 = 0.08;
const LEGAL_TAX_THRESHOLD: f64 = 0.4;

const TOP_CUSTOMER_RISK_TIERS: &[(f64, f64)] = &[(0.30, 0.15), (0.20, 0.08)];
const TOP3_CUSTOMER_RISK_TIERS: &[(f64, f64)] = &[(0.60, 0.10), (0.40, 0.05)];

/// Kind of risk discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskDiscountKind {
    Marketability,
    KeyPerson,
    CustomerConcentration,
    Top3Concentration,
    Documentation,
    LegalTax,
}

impl RiskDiscountKind {
    /// Structural discounts come with being a private company and cannot be
    /// removed without a transaction. Everything else is addressable.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Marketability)
    }
}

/// One multiplicative risk discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDiscount {
    pub kind: RiskDiscountKind,
    pub name: String,
    /// Discount rate in [0, 1)
    pub rate: f64,
    pub explanation: String,
}

/// The discount bundle and its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub discounts: Vec<RiskDiscount>,
    /// Π(1 - rate), in (0, 1]
    pub risk_multiplier: f64,
    /// 1 - risk_multiplier
    pub risk_severity_score: f64,
}

impl RiskResult {
    /// Build a result from a discount list.
    pub fn from_discounts(discounts: Vec<RiskDiscount>) -> Self {
        let risk_multiplier = risk_multiplier(&discounts);
        Self {
            discounts,
            risk_multiplier,
            risk_severity_score: 1.0 - risk_multiplier,
        }
    }

    /// Product of the structural discounts only.
    pub fn structural_multiplier(&self) -> f64 {
        self.discounts
            .iter()
            .filter(|d| d.kind.is_structural())
            .map(|d| 1.0 - d.rate)
            .product()
    }
}

/// Π(1 - rate_i) over a discount list.
pub fn risk_multiplier(discounts: &[RiskDiscount]) -> f64 {
    discounts.iter().map(|d| 1.0 - d.rate).product()
}

/// Inputs to the risk engine that do not live on the financial profile.
#[derive(Debug, Clone, Default)]
pub struct RiskInputs {
    pub owner_involvement: Option<OwnerInvolvement>,
    pub transferability_score: Option<f64>,
    pub financial_score: Option<f64>,
    pub legal_tax_score: Option<f64>,
}

/// Marketability discount for a size band.
pub fn dlom_rate(size: Option<SizeCategory>) -> f64 {
    match size {
        Some(SizeCategory::UnderHalfMillion) => 0.25,
        Some(SizeCategory::HalfToOneMillion) => 0.22,
        Some(SizeCategory::OneToThreeMillion) => 0.20,
        Some(SizeCategory::ThreeToTenMillion) => 0.16,
        Some(SizeCategory::TenToTwentyFiveMillion) => 0.12,
        Some(SizeCategory::OverTwentyFiveMillion) => 0.10,
        None => DEFAULT_DLOM,
    }
}

/// Base key-person rate before Transferability modulation.
pub fn key_person_base_rate(involvement: OwnerInvolvement) -> f64 {
    match involvement {
        OwnerInvolvement::Critical => 0.25,
        OwnerInvolvement::High => 0.18,
        OwnerInvolvement::Moderate => 0.10,
        OwnerInvolvement::Low => 0.05,
        OwnerInvolvement::Minimal => 0.0,
    }
}

/// `clamp(base × (1 - (transferability - 0.5) × 0.5), 0, 0.30)`.
pub fn key_person_rate(involvement: OwnerInvolvement, transferability: Option<f64>) -> f64 {
    let transferability = transferability.unwrap_or(0.5).clamp(0.0, 1.0);
    (key_person_base_rate(involvement) * (1.0 - (transferability - 0.5) * 0.5))
        .clamp(0.0, MAX_KEY_PERSON_RATE)
}

fn pct(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

/// Compute the risk discount bundle.
pub fn compute_risk_discounts(profile: &FinancialProfile, inputs: &RiskInputs) -> RiskResult {
    let mut discounts = Vec::new();

    let size = profile.size_tier();
    let dlom = dlom_rate(size);
    discounts.push(RiskDiscount {
        kind: RiskDiscountKind::Marketability,
        name: "Lack of Marketability (DLOM)".into(),
        rate: dlom,
        explanation: match size {
            Some(size) => format!(
                "Private businesses with revenue {} sell at a {} marketability discount",
                size.label(),
                pct(dlom)
            ),
            None => format!("Size unknown; standard {} marketability discount", pct(dlom)),
        },
    });

    if let Some(involvement) = inputs.owner_involvement {
        let rate = key_person_rate(involvement, inputs.transferability_score);
        if rate >= MIN_MATERIAL_RATE {
            discounts.push(RiskDiscount {
                kind: RiskDiscountKind::KeyPerson,
                name: "Key Person Risk".into(),
                rate,
                explanation: format!(
                    "Owner involvement is {:?}; buyers price a {} key-person discount",
                    involvement,
                    pct(rate)
                ),
            });
        }
    }

    let mut single_customer_high = false;
    if let Some(top) = profile.top_customer_concentration {
        if let Some((idx, (_, rate))) = TOP_CUSTOMER_RISK_TIERS
            .iter()
            .enumerate()
            .find(|(_, (threshold, _))| top >= *threshold)
        {
            single_customer_high = idx == 0;
            discounts.push(RiskDiscount {
                kind: RiskDiscountKind::CustomerConcentration,
                name: "Customer Concentration".into(),
                rate: *rate,
                explanation: format!(
                    "Largest customer is {} of revenue; loss of that account is a deal risk",
                    pct(top)
                ),
            });
        }
    }
    if let Some(top3) = profile.top3_customer_concentration {
        if !single_customer_high {
            if let Some((_, rate)) = TOP3_CUSTOMER_RISK_TIERS
                .iter()
                .find(|(threshold, _)| top3 >= *threshold)
            {
                discounts.push(RiskDiscount {
                    kind: RiskDiscountKind::Top3Concentration,
                    name: "Top-3 Customer Concentration".into(),
                    rate: *rate,
                    explanation: format!("Top three customers are {} of revenue", pct(top3)),
                });
            }
        }
    }

    if let Some(financial) = inputs.financial_score {
        if financial < DOCUMENTATION_THRESHOLD {
            discounts.push(RiskDiscount {
                kind: RiskDiscountKind::Documentation,
                name: "Financial Documentation".into(),
                rate: DOCUMENTATION_RATE,
                explanation: format!(
                    "Financial readiness of {} suggests records will not survive diligence cleanly",
                    pct(financial)
                ),
            });
        }
    }

    if let Some(legal) = inputs.legal_tax_score {
        if legal < LEGAL_TAX_THRESHOLD {
            discounts.push(RiskDiscount {
                kind: RiskDiscountKind::LegalTax,
                name: "Legal / Tax Exposure".into(),
                rate: LEGAL_TAX_RATE,
                explanation: format!(
                    "Legal/Tax readiness of {} signals unresolved exposure",
                    pct(legal)
                ),
            });
        }
    }

    let result = RiskResult::from_discounts(discounts);
    tracing::debug!(
        discounts = result.discounts.len(),
        risk_multiplier = result.risk_multiplier,
        "Computed risk discounts"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn discount(kind: RiskDiscountKind, rate: f64) -> RiskDiscount {
        RiskDiscount {
            kind,
            name: format!("{:?}", kind),
            rate,
            explanation: String::new(),
        }
    }

    fn rate_of(result: &RiskResult, kind: RiskDiscountKind) -> Option<f64> {
        result.discounts.iter().find(|d| d.kind == kind).map(|d| d.rate)
    }

    #[test]
    fn test_risk_multiplier_product() {
        let result = RiskResult::from_discounts(vec![
            discount(RiskDiscountKind::Marketability, 0.18),
            discount(RiskDiscountKind::KeyPerson, 0.10),
        ]);
        assert!((result.risk_multiplier - 0.738).abs() < 1e-12);
        assert!((result.risk_severity_score - 0.262).abs() < 1e-12);
        assert!((result.structural_multiplier() - 0.82).abs() < 1e-12);
    }

    #[test]
    fn test_dlom_always_present() {
        let result = compute_risk_discounts(&FinancialProfile::default(), &RiskInputs::default());
        assert_eq!(result.discounts.len(), 1);
        assert_eq!(rate_of(&result, RiskDiscountKind::Marketability), Some(DEFAULT_DLOM));

        let big = FinancialProfile {
            revenue: 40_000_000.0,
            ..Default::default()
        };
        let result = compute_risk_discounts(&big, &RiskInputs::default());
        assert_eq!(rate_of(&result, RiskDiscountKind::Marketability), Some(0.10));
    }

    #[test]
    fn test_key_person_modulation() {
        // Neutral transferability leaves the base rate unchanged
        assert!((key_person_rate(OwnerInvolvement::Critical, None) - 0.25).abs() < 1e-12);
        // Zero transferability: 0.25 × 1.25 = 0.3125, capped at 0.30
        assert!((key_person_rate(OwnerInvolvement::Critical, Some(0.0)) - 0.30).abs() < 1e-12);
        // Full transferability: 0.10 × 0.75
        assert!((key_person_rate(OwnerInvolvement::Moderate, Some(1.0)) - 0.075).abs() < 1e-12);
        assert_eq!(key_person_rate(OwnerInvolvement::Minimal, Some(0.0)), 0.0);
    }

    #[test]
    fn test_key_person_dropped_when_immaterial() {
        let inputs = RiskInputs {
            owner_involvement: Some(OwnerInvolvement::Minimal),
            ..Default::default()
        };
        let result = compute_risk_discounts(&FinancialProfile::default(), &inputs);
        assert_eq!(rate_of(&result, RiskDiscountKind::KeyPerson), None);

        let inputs = RiskInputs {
            owner_involvement: Some(OwnerInvolvement::Low),
            transferability_score: Some(1.0),
            ..Default::default()
        };
        // 0.05 × 0.75 = 0.0375 stays
        let result = compute_risk_discounts(&FinancialProfile::default(), &inputs);
        assert!((rate_of(&result, RiskDiscountKind::KeyPerson).unwrap() - 0.0375).abs() < 1e-12);
    }

    #[test]
    fn test_concentration_rates() {
        let mut p = FinancialProfile {
            top_customer_concentration: Some(0.31),
            top3_customer_concentration: Some(0.65),
            ..Default::default()
        };
        let result = compute_risk_discounts(&p, &RiskInputs::default());
        assert_eq!(rate_of(&result, RiskDiscountKind::CustomerConcentration), Some(0.15));
        assert_eq!(rate_of(&result, RiskDiscountKind::Top3Concentration), None);

        p.top_customer_concentration = Some(0.2);
        let result = compute_risk_discounts(&p, &RiskInputs::default());
        assert_eq!(rate_of(&result, RiskDiscountKind::CustomerConcentration), Some(0.08));
        assert_eq!(rate_of(&result, RiskDiscountKind::Top3Concentration), Some(0.10));

        p.top_customer_concentration = None;
        p.top3_customer_concentration = Some(0.41);
        let result = compute_risk_discounts(&p, &RiskInputs::default());
        assert_eq!(rate_of(&result, RiskDiscountKind::Top3Concentration), Some(0.05));
    }

    #[test]
    fn test_documentation_and_legal() {
        let inputs = RiskInputs {
            financial_score: Some(0.49),
            legal_tax_score: Some(0.39),
            ..Default::default()
        };
        let result = compute_risk_discounts(&FinancialProfile::default(), &inputs);
        assert_eq!(rate_of(&result, RiskDiscountKind::Documentation), Some(0.05));
        assert_eq!(rate_of(&result, RiskDiscountKind::LegalTax), Some(0.08));

        let inputs = RiskInputs {
            financial_score: Some(0.5),
            legal_tax_score: Some(0.4),
            ..Default::default()
        };
        let result = compute_risk_discounts(&FinancialProfile::default(), &inputs);
        assert_eq!(result.discounts.len(), 1);
    }

    #[test]
    fn test_only_dlom_is_structural() {
        assert!(RiskDiscountKind::Marketability.is_structural());
        assert!(!RiskDiscountKind::KeyPerson.is_structural());
        assert!(!RiskDiscountKind::LegalTax.is_structural());
    }

    proptest! {
        #[test]
        fn prop_risk_multiplier_bounded(
            revenue in 0.0f64..50_000_000.0,
            top in prop::option::of(0.0f64..1.0),
            top3 in prop::option::of(0.0f64..1.0),
            owner in prop::option::of(prop::sample::select(vec![
                OwnerInvolvement::Critical, OwnerInvolvement::High, OwnerInvolvement::Moderate,
                OwnerInvolvement::Low, OwnerInvolvement::Minimal,
            ])),
            transferability in prop::option::of(-0.5f64..1.5),
            financial in prop::option::of(0.0f64..1.0),
            legal in prop::option::of(0.0f64..1.0),
        ) {
            let p = FinancialProfile {
                revenue,
                top_customer_concentration: top,
                top3_customer_concentration: top3,
                ..Default::default()
            };
            let inputs = RiskInputs {
                owner_involvement: owner,
                transferability_score: transferability,
                financial_score: financial,
                legal_tax_score: legal,
            };
            let result = compute_risk_discounts(&p, &inputs);
            prop_assert!(result.risk_multiplier > 0.0);
            prop_assert!(result.risk_multiplier <= 1.0);
            prop_assert!(result.discounts.iter().all(|d| (0.0..1.0).contains(&d.rate)));
        }
    }
}
