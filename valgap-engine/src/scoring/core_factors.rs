//! Core Factor Scorer.
//!
//! Maps five categorical business attributes to a 0-1 quality score. Every
//! attribute goes through a fixed lookup table; absent or unrecognized values
//! count as a neutral 0.5 instead of failing.
//!
//! | Attribute | Table | Weight |
//! |-----------|-------|--------|
//! | Revenue model | PROJECT_BASED 0.25 → SUBSCRIPTION 1.0 | 1.0 |
//! | Gross margin proxy | LOW 0.25 → EXCELLENT 1.0 | 1.0 |
//! | Labor intensity | VERY_HIGH 0.25 → LOW 1.0 | 1.0 |
//! | Asset intensity | ASSET_HEAVY 0.33 → ASSET_LIGHT 1.0 | 1.0 |
//! | Owner involvement | CRITICAL 0.0 → MINIMAL 1.0 | 0.5 |
//!
//! Owner involvement carries half weight because the readiness Transferability
//! category scores the same concern.

use serde::{Deserialize, Serialize};

use crate::types::RevenueModel;

/// Score used for absent or unrecognized attribute values.
pub const NEUTRAL_SCORE: f64 = 0.5;

const GROSS_MARGIN_TABLE: &[(&str, f64)] = &[
    ("LOW", 0.25),
    ("MODERATE", 0.5),
    ("HIGH", 0.75),
    ("EXCELLENT", 1.0),
];

const LABOR_INTENSITY_TABLE: &[(&str, f64)] = &[
    ("VERY_HIGH", 0.25),
    ("HIGH", 0.5),
    ("MODERATE", 0.75),
    ("LOW", 1.0),
];

const ASSET_INTENSITY_TABLE: &[(&str, f64)] = &[
    ("ASSET_HEAVY", 0.33),
    ("MODERATE", 0.67),
    ("ASSET_LIGHT", 1.0),
];

const STANDARD_WEIGHT: f64 = 1.0;
const OWNER_INVOLVEMENT_WEIGHT: f64 = 0.5;

// ============================================================================
// Owner Involvement
// ============================================================================

/// How much the business depends on its owner day to day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerInvolvement {
    Critical,
    High,
    Moderate,
    Low,
    Minimal,
}

impl OwnerInvolvement {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Self::Critical),
            "HIGH" => Some(Self::High),
            "MODERATE" => Some(Self::Moderate),
            "LOW" => Some(Self::Low),
            "MINIMAL" => Some(Self::Minimal),
            _ => None,
        }
    }

    /// Quality score: the less the owner is needed, the better.
    pub fn score(&self) -> f64 {
        match self {
            Self::Critical => 0.0,
            Self::High => 0.25,
            Self::Moderate => 0.5,
            Self::Low => 0.75,
            Self::Minimal => 1.0,
        }
    }
}

fn revenue_model_score(model: RevenueModel) -> f64 {
    match model {
        RevenueModel::ProjectBased => 0.25,
        RevenueModel::Transactional => 0.5,
        RevenueModel::RecurringContracts => 0.75,
        RevenueModel::Subscription => 1.0,
    }
}

// ============================================================================
// Core Factors
// ============================================================================

/// Categorical business attributes as supplied by the company record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreFactors {
    #[serde(default)]
    pub revenue_model: Option<String>,
    #[serde(default)]
    pub gross_margin_proxy: Option<String>,
    #[serde(default)]
    pub labor_intensity: Option<String>,
    #[serde(default)]
    pub asset_intensity: Option<String>,
    #[serde(default)]
    pub owner_involvement: Option<String>,
}

impl CoreFactors {
    /// Parsed owner involvement, if recognizable.
    pub fn owner_involvement(&self) -> Option<OwnerInvolvement> {
        self.owner_involvement
            .as_deref()
            .and_then(OwnerInvolvement::from_code)
    }

    /// Parsed revenue model, if recognizable.
    pub fn revenue_model(&self) -> Option<RevenueModel> {
        self.revenue_model.as_deref().and_then(RevenueModel::from_code)
    }
}

/// Score contribution of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: String,
    pub value: f64,
    pub weight: f64,
    /// False when the attribute was absent or unrecognized and scored neutral
    pub recognized: bool,
}

/// Weighted core quality score with its per-attribute breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreFactorScore {
    /// Weighted average in [0, 1]
    pub score: f64,
    pub factors: Vec<FactorScore>,
}

fn table_lookup(table: &[(&str, f64)], code: Option<&str>) -> Option<f64> {
    let code = code?.trim().to_ascii_uppercase();
    table
        .iter()
        .find(|(key, _)| *key == code)
        .map(|(_, value)| *value)
}

fn factor(name: &str, value: Option<f64>, weight: f64) -> FactorScore {
    FactorScore {
        factor: name.to_string(),
        value: value.unwrap_or(NEUTRAL_SCORE),
        weight,
        recognized: value.is_some(),
    }
}

/// Score the five core factors.
pub fn score_core_factors(factors: &CoreFactors) -> CoreFactorScore {
    let breakdown = vec![
        factor(
            "revenue_model",
            factors.revenue_model().map(revenue_model_score),
            STANDARD_WEIGHT,
        ),
        factor(
            "gross_margin_proxy",
            table_lookup(GROSS_MARGIN_TABLE, factors.gross_margin_proxy.as_deref()),
            STANDARD_WEIGHT,
        ),
        factor(
            "labor_intensity",
            table_lookup(LABOR_INTENSITY_TABLE, factors.labor_intensity.as_deref()),
            STANDARD_WEIGHT,
        ),
        factor(
            "asset_intensity",
            table_lookup(ASSET_INTENSITY_TABLE, factors.asset_intensity.as_deref()),
            STANDARD_WEIGHT,
        ),
        factor(
            "owner_involvement",
            factors.owner_involvement().map(|o| o.score()),
            OWNER_INVOLVEMENT_WEIGHT,
        ),
    ];

    let total_weight: f64 = breakdown.iter().map(|f| f.weight).sum();
    let weighted: f64 = breakdown.iter().map(|f| f.value * f.weight).sum();
    let score = (weighted / total_weight).clamp(0.0, 1.0);

    CoreFactorScore {
        score,
        factors: breakdown,
    }
}
