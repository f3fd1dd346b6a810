//! Canonical valuation formula.
//!
//! ```text
//! median                  = (low + high) / 2
//! qualityAdjustedMultiple = median × adjustmentMultiplier
//! riskAdjustedMultiple    = qualityAdjustedMultiple × riskMultiplier
//! evMid                   = EBITDA × riskAdjustedMultiple
//! evLow / evHigh          = evMid × (1 ∓ spread)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::reference::MultipleRange;
use crate::types::round_currency;

/// Default fractional width of the EV range.
pub const DEFAULT_SPREAD_FACTOR: f64 = 0.15;

/// Output of the canonical formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalValuation {
    pub median_multiple: f64,
    pub quality_adjusted_multiple: f64,
    pub risk_adjusted_multiple: f64,
    pub ev_low: f64,
    pub ev_mid: f64,
    pub ev_high: f64,
    pub spread_factor: f64,
}

/// Apply the canonical formula.
///
/// EBITDA ≤ 0 yields a zeroed EV range; the multiples are still reported.
pub fn canonical_valuation(
    ebitda: f64,
    range: &MultipleRange,
    adjustment_multiplier: f64,
    risk_multiplier: f64,
    spread_factor: f64,
) -> EngineResult<CanonicalValuation> {
    if !ebitda.is_finite() {
        return Err(EngineError::invalid("ebitda", "must be a finite number"));
    }
    if !(0.0..1.0).contains(&spread_factor) {
        return Err(EngineError::invalid(
            "spread_factor",
            format!("{} is outside [0, 1)", spread_factor),
        ));
    }
    if !(adjustment_multiplier.is_finite() && adjustment_multiplier > 0.0) {
        return Err(EngineError::invalid(
            "adjustment_multiplier",
            "must be positive",
        ));
    }
    if !(risk_multiplier > 0.0 && risk_multiplier <= 1.0) {
        return Err(EngineError::invalid("risk_multiplier", "must be in (0, 1]"));
    }

    let median_multiple = range.ebitda_median();
    let quality_adjusted_multiple = median_multiple * adjustment_multiplier;
    let risk_adjusted_multiple = quality_adjusted_multiple * risk_multiplier;

    let (ev_low, ev_mid, ev_high) = if ebitda > 0.0 {
        let ev_mid = ebitda * risk_adjusted_multiple;
        (
            round_currency(ev_mid * (1.0 - spread_factor)),
            round_currency(ev_mid),
            round_currency(ev_mid * (1.0 + spread_factor)),
        )
    } else {
        tracing::debug!(ebitda, "Non-positive EBITDA, canonical valuation zeroed");
        (0.0, 0.0, 0.0)
    };

    Ok(CanonicalValuation {
        median_multiple,
        quality_adjusted_multiple,
        risk_adjusted_multiple,
        ev_low,
        ev_mid,
        ev_high,
        spread_factor,
    })
}
