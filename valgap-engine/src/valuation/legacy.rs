//! Legacy valuation formula.
//!
//! ```text
//! baseMultiple     = low + coreScore × (high - low)
//! discountFraction = (1 - compositeReadiness)^1.4
//! finalMultiple    = low + (baseMultiple - low) × (1 - discountFraction)
//! currentValue     = EBITDA × finalMultiple
//! potentialValue   = EBITDA × high
//! gap              = potentialValue - currentValue
//! ```
//!
//! The final multiple never drops below the low end of the range.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::reference::MultipleRange;
use crate::types::round_currency;

/// Exponent applied to the readiness shortfall.
pub const READINESS_DISCOUNT_EXPONENT: f64 = 1.4;

/// Output of the legacy formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyValuation {
    pub base_multiple: f64,
    pub discount_fraction: f64,
    pub final_multiple: f64,
    pub current_value: f64,
    pub potential_value: f64,
    pub value_gap: f64,
}

/// Apply the legacy formula.
///
/// EBITDA ≤ 0 yields zero values; the multiples are still computed.
pub fn legacy_valuation(
    ebitda: f64,
    range: &MultipleRange,
    core_score: f64,
    composite_readiness: f64,
) -> EngineResult<LegacyValuation> {
    if !ebitda.is_finite() {
        return Err(EngineError::invalid("ebitda", "must be a finite number"));
    }
    if !core_score.is_finite() || !composite_readiness.is_finite() {
        return Err(EngineError::invalid("score", "must be a finite number"));
    }

    let core_score = core_score.clamp(0.0, 1.0);
    let composite_readiness = composite_readiness.clamp(0.0, 1.0);
    let (low, high) = (range.ebitda_low, range.ebitda_high);

    let base_multiple = low + core_score * (high - low);
    let discount_fraction = (1.0 - composite_readiness).powf(READINESS_DISCOUNT_EXPONENT);
    let final_multiple = (low + (base_multiple - low) * (1.0 - discount_fraction)).max(low);

    if ebitda <= 0.0 {
        tracing::debug!(ebitda, "Non-positive EBITDA, legacy valuation zeroed");
        return Ok(LegacyValuation {
            base_multiple,
            discount_fraction,
            final_multiple,
            current_value: 0.0,
            potential_value: 0.0,
            value_gap: 0.0,
        });
    }

    let current_value = round_currency(ebitda * final_multiple);
    let potential_value = round_currency(ebitda * high);

    Ok(LegacyValuation {
        base_multiple,
        discount_fraction,
        final_multiple,
        current_value,
        potential_value,
        value_gap: (potential_value - current_value).max(0.0),
    })
}
