//! WACC Defaults Engine.
//!
//! Produces calibrated discount-rate components for a private company from its
//! EBITDA size tier and buyer-readiness score:
//!
//! ```text
//! costOfEquity = riskFree + β × ERP + sizePremium + CSR
//! WACC         = E × costOfEquity + D × costOfDebt × (1 - taxRate)
//! ```
//!
//! - Size premium: log-linear interpolation between anchor points, clamped to
//!   the tier's band.
//! - Company-specific risk (CSR): linear inverse of readiness within the tier's band.
//! - Cost of debt and tax rate: derived from the statements when plausible,
//!   otherwise the tier midpoint and the configured default.

use serde::{Deserialize, Serialize};
use valgap_common::config::WaccConfig;

use crate::error::{EngineError, EngineResult};
use crate::types::FinancialPeriod;

/// (EBITDA, size premium) anchors for log-linear interpolation.
const SIZE_PREMIUM_ANCHORS: [(f64, f64); 8] = [
    (250_000.0, 0.08),
    (500_000.0, 0.07),
    (1_000_000.0, 0.06),
    (2_500_000.0, 0.05),
    (5_000_000.0, 0.04),
    (10_000_000.0, 0.03),
    (25_000_000.0, 0.02),
    (50_000_000.0, 0.015),
];

/// Derived cost of debt outside this band is ignored.
pub const COST_OF_DEBT_BOUNDS: (f64, f64) = (0.03, 0.20);
/// Derived tax rate outside this band is ignored.
pub const TAX_RATE_BOUNDS: (f64, f64) = (0.05, 0.50);

/// Readiness assumed when no assessment exists.
const NEUTRAL_READINESS: f64 = 0.5;

// ============================================================================
// Size Tiers
// ============================================================================

/// EBITDA size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EbitdaTier {
    /// Under $500K
    Micro,
    /// $500K - $1M
    Small,
    /// $1M - $3M
    LowerMiddle,
    /// $3M - $5M
    Middle,
    /// $5M - $10M
    UpperMiddle,
    /// $10M - $25M
    Large,
    /// $25M and above
    Enterprise,
}

/// Rate bands for one tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierParameters {
    pub size_premium: (f64, f64),
    pub company_specific_risk: (f64, f64),
    pub cost_of_debt: (f64, f64),
    pub debt_weight: f64,
}

impl EbitdaTier {
    pub fn from_ebitda(ebitda: f64) -> Self {
        if ebitda < 500_000.0 {
            Self::Micro
        } else if ebitda < 1_000_000.0 {
            Self::Small
        } else if ebitda < 3_000_000.0 {
            Self::LowerMiddle
        } else if ebitda < 5_000_000.0 {
            Self::Middle
        } else if ebitda < 10_000_000.0 {
            Self::UpperMiddle
        } else if ebitda < 25_000_000.0 {
            Self::Large
        } else {
            Self::Enterprise
        }
    }

    pub fn parameters(&self) -> TierParameters {
        let (size_premium, company_specific_risk, cost_of_debt, debt_weight) = match self {
            Self::Micro => ((0.07, 0.09), (0.06, 0.12), (0.09, 0.12), 0.10),
            Self::Small => ((0.06, 0.07), (0.05, 0.10), (0.08, 0.11), 0.15),
            Self::LowerMiddle => ((0.047, 0.06), (0.04, 0.08), (0.075, 0.10), 0.20),
            Self::Middle => ((0.04, 0.048), (0.03, 0.06), (0.07, 0.09), 0.25),
            Self::UpperMiddle => ((0.03, 0.04), (0.02, 0.05), (0.065, 0.085), 0.30),
            Self::Large => ((0.02, 0.03), (0.015, 0.04), (0.06, 0.08), 0.35),
            Self::Enterprise => ((0.01, 0.02), (0.01, 0.03), (0.055, 0.075), 0.40),
        };
        TierParameters {
            size_premium,
            company_specific_risk,
            cost_of_debt,
            debt_weight,
        }
    }
}

impl std::fmt::Display for EbitdaTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Micro => write!(f, "Micro"),
            Self::Small => write!(f, "Small"),
            Self::LowerMiddle => write!(f, "Lower Middle Market"),
            Self::Middle => write!(f, "Middle Market"),
            Self::UpperMiddle => write!(f, "Upper Middle Market"),
            Self::Large => write!(f, "Large"),
            Self::Enterprise => write!(f, "Enterprise"),
        }
    }
}

/// Size premium by log-linear interpolation between anchors.
///
/// Values outside the anchor span take the nearest anchor's premium.
pub fn interpolate_size_premium(ebitda: f64) -> f64 {
    let (first_x, first_y) = SIZE_PREMIUM_ANCHORS[0];
    let (last_x, last_y) = SIZE_PREMIUM_ANCHORS[SIZE_PREMIUM_ANCHORS.len() - 1];
    if !ebitda.is_finite() || ebitda <= first_x {
        return first_y;
    }
    if ebitda >= last_x {
        return last_y;
    }

    SIZE_PREMIUM_ANCHORS
        .windows(2)
        .find(|w| ebitda <= w[1].0)
        .map(|w| {
            let ((x0, y0), (x1, y1)) = (w[0], w[1]);
            let t = (ebitda.ln() - x0.ln()) / (x1.ln() - x0.ln());
            y0 + t * (y1 - y0)
        })
        .unwrap_or(last_y)
}

/// Company-specific risk premium: higher readiness gives a lower premium.
pub fn company_specific_risk(tier: EbitdaTier, readiness: Option<f64>) -> f64 {
    let (low, high) = tier.parameters().company_specific_risk;
    let readiness = readiness
        .filter(|r| r.is_finite())
        .unwrap_or(NEUTRAL_READINESS)
        .clamp(0.0, 1.0);
    high - readiness * (high - low)
}

// ============================================================================
// WACC Calculation
// ============================================================================

/// Where a rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Derived from the company's financial statements
    Derived,
    /// Tier midpoint or configured default
    Default,
}

/// Company-specific inputs to the WACC engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaccInputs {
    pub ebitda: f64,
    /// Composite readiness score in [0, 1]
    pub readiness_score: Option<f64>,
    /// Industry beta; the configured default is used when absent
    pub beta: Option<f64>,
    /// Interest expense / total debt
    pub derived_cost_of_debt: Option<f64>,
    /// Tax expense / pre-tax income
    pub derived_tax_rate: Option<f64>,
}

impl WaccInputs {
    /// Fill the derived rates from the most recent period that reports each.
    pub fn with_periods(mut self, periods: &[FinancialPeriod]) -> Self {
        let mut sorted: Vec<&FinancialPeriod> = periods.iter().collect();
        sorted.sort_by(|a, b| b.fiscal_year.cmp(&a.fiscal_year));
        self.derived_cost_of_debt = sorted.iter().find_map(|p| p.implied_cost_of_debt());
        self.derived_tax_rate = sorted.iter().find_map(|p| p.effective_tax_rate());
        self
    }
}

/// Full WACC build-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaccBreakdown {
    pub tier: EbitdaTier,
    pub risk_free_rate: f64,
    pub beta: f64,
    pub equity_risk_premium: f64,
    pub size_premium: f64,
    pub company_specific_risk: f64,
    pub cost_of_equity: f64,
    pub pre_tax_cost_of_debt: f64,
    pub cost_of_debt_source: RateSource,
    pub tax_rate: f64,
    pub tax_rate_source: RateSource,
    pub after_tax_cost_of_debt: f64,
    pub debt_weight: f64,
    pub equity_weight: f64,
    pub wacc: f64,
}

fn within(value: Option<f64>, (min, max): (f64, f64)) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= min && *v <= max)
}

/// WACC defaults engine.
#[derive(Debug, Clone, Default)]
pub struct WaccEngine {
    config: WaccConfig,
}

impl WaccEngine {
    pub fn new(config: WaccConfig) -> Self {
        Self { config }
    }

    /// Build the WACC for a company.
    pub fn compute(&self, inputs: &WaccInputs) -> EngineResult<WaccBreakdown> {
        if !inputs.ebitda.is_finite() {
            return Err(EngineError::invalid("ebitda", "must be a finite number"));
        }

        let tier = EbitdaTier::from_ebitda(inputs.ebitda);
        let params = tier.parameters();

        let size_premium = interpolate_size_premium(inputs.ebitda)
            .clamp(params.size_premium.0, params.size_premium.1);
        let csr = company_specific_risk(tier, inputs.readiness_score);
        let beta = inputs
            .beta
            .filter(|b| b.is_finite() && *b > 0.0)
            .unwrap_or(self.config.default_beta);

        let cost_of_equity = self.config.risk_free_rate
            + beta * self.config.equity_risk_premium
            + size_premium
            + csr;

        let (pre_tax_cost_of_debt, cost_of_debt_source) =
            match within(inputs.derived_cost_of_debt, COST_OF_DEBT_BOUNDS) {
                Some(rate) => (rate, RateSource::Derived),
                None => (
                    (params.cost_of_debt.0 + params.cost_of_debt.1) / 2.0,
                    RateSource::Default,
                ),
            };
        let (tax_rate, tax_rate_source) = match within(inputs.derived_tax_rate, TAX_RATE_BOUNDS) {
            Some(rate) => (rate, RateSource::Derived),
            None => (self.config.default_tax_rate, RateSource::Default),
        };

        let debt_weight = params.debt_weight;
        let equity_weight = 1.0 - debt_weight;
        let after_tax_cost_of_debt = pre_tax_cost_of_debt * (1.0 - tax_rate);
        let wacc = equity_weight * cost_of_equity + debt_weight * after_tax_cost_of_debt;

        if !wacc.is_finite() || wacc <= 0.0 {
            return Err(EngineError::invalid("wacc", format!("computed {} is not positive", wacc)));
        }

        tracing::debug!(
            tier = %tier,
            size_premium,
            company_specific_risk = csr,
            cost_of_equity,
            wacc,
            "Computed WACC"
        );

        Ok(WaccBreakdown {
            tier,
            risk_free_rate: self.config.risk_free_rate,
            beta,
            equity_risk_premium: self.config.equity_risk_premium,
            size_premium,
            company_specific_risk: csr,
            cost_of_equity,
            pre_tax_cost_of_debt,
            cost_of_debt_source,
            tax_rate,
            tax_rate_source,
            after_tax_cost_of_debt,
            debt_weight,
            equity_weight,
            wacc,
        })
    }
}
