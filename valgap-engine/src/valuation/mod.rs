//! Valuation Calculator.
//!
//! Two formulas are kept side by side: the legacy readiness-discount formula
//! and the canonical quality × risk formula. Both are pure functions over the
//! same inputs and both results are written to every snapshot, so historical
//! snapshots stay reproducible while callers migrate.

pub mod canonical;
pub mod legacy;

pub use canonical::{canonical_valuation, CanonicalValuation, DEFAULT_SPREAD_FACTOR};
pub use legacy::{legacy_valuation, LegacyValuation, READINESS_DISCOUNT_EXPONENT};

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::reference::MultipleRange;

/// Inputs shared by both formulas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationInputs {
    pub ebitda: f64,
    pub range: MultipleRange,
    /// Core factor score (legacy)
    pub core_score: f64,
    /// Weighted composite readiness score (legacy)
    pub composite_readiness: f64,
    /// Quality adjustment multiplier (canonical)
    pub adjustment_multiplier: f64,
    /// Risk multiplier (canonical)
    pub risk_multiplier: f64,
}

/// Both formula results for one set of inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub legacy: LegacyValuation,
    pub canonical: CanonicalValuation,
}

/// Runs both valuation formulas with a configured spread factor.
#[derive(Debug, Clone)]
pub struct ValuationCalculator {
    spread_factor: f64,
}

impl Default for ValuationCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl ValuationCalculator {
    /// Create a calculator with the default 15% spread.
    pub fn new() -> Self {
        Self {
            spread_factor: DEFAULT_SPREAD_FACTOR,
        }
    }

    /// Create a calculator with a custom spread factor.
    pub fn with_spread(spread_factor: f64) -> Self {
        Self { spread_factor }
    }

    pub fn spread_factor(&self) -> f64 {
        self.spread_factor
    }

    /// Compute both formulas.
    pub fn calculate(&self, inputs: &ValuationInputs) -> EngineResult<ValuationResult> {
        let legacy = legacy_valuation(
            inputs.ebitda,
            &inputs.range,
            inputs.core_score,
            inputs.composite_readiness,
        )?;
        let canonical = canonical_valuation(
            inputs.ebitda,
            &inputs.range,
            inputs.adjustment_multiplier,
            inputs.risk_multiplier,
            self.spread_factor,
        )?;

        tracing::debug!(
            legacy_value = legacy.current_value,
            ev_mid = canonical.ev_mid,
            risk_adjusted_multiple = canonical.risk_adjusted_multiple,
            "Computed valuation"
        );

        Ok(ValuationResult { legacy, canonical })
    }
}
