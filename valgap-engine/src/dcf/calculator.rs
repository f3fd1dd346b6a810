//! DCF Calculator.
//!
//! Projects free cash flow along the growth path, discounts each year at WACC
//! (mid-year convention by default) and adds a discounted terminal value.
//!
//! ```text
//! FCF_t  = FCF_0 × Π(1 + g_i), i ≤ t
//! PV_t   = FCF_t / (1 + WACC)^(t - 0.5)        (mid-year)
//! TV     = FCF_N × (1 + g) / (WACC - g)        (Gordon growth)
//! EV     = Σ PV_t + TV / (1 + WACC)^N
//! Equity = EV - net debt
//! ```

use serde::{Deserialize, Serialize};

use super::projection::{DcfAssumptions, TerminalValueMethod};
use crate::error::{EngineError, EngineResult};

/// DCF output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfResult {
    pub projected_fcf: Vec<f64>,
    pub present_values: Vec<f64>,
    pub sum_pv_fcf: f64,
    pub terminal_value: f64,
    pub pv_terminal_value: f64,
    pub enterprise_value: f64,
    pub net_debt: f64,
    pub equity_value: f64,
    /// EV / base EBITDA when EBITDA is positive
    pub implied_multiple: Option<f64>,
    pub wacc: f64,
    pub terminal_growth_rate: f64,
}

impl DcfResult {
    /// Share of enterprise value contributed by the terminal value.
    pub fn terminal_share(&self) -> f64 {
        if self.enterprise_value > 0.0 {
            self.pv_terminal_value / self.enterprise_value
        } else {
            0.0
        }
    }
}

fn validate(a: &DcfAssumptions) -> EngineResult<()> {
    if !a.base_fcf.is_finite() {
        return Err(EngineError::invalid("base_fcf", "must be a finite number"));
    }
    if a.base_fcf <= 0.0 {
        return Err(EngineError::NegativeFcf { fcf: a.base_fcf });
    }
    if a.growth_rates.is_empty() {
        return Err(EngineError::invalid("growth_rates", "at least one projection year is required"));
    }
    if a.growth_rates.iter().any(|g| !g.is_finite() || *g <= -1.0) {
        return Err(EngineError::invalid("growth_rates", "rates must be finite and above -100%"));
    }
    if !a.wacc.is_finite() || a.wacc <= 0.0 {
        return Err(EngineError::invalid("wacc", "must be positive"));
    }
    if !a.terminal_growth_rate.is_finite() {
        return Err(EngineError::invalid("terminal_growth_rate", "must be a finite number"));
    }
    if a.wacc <= a.terminal_growth_rate {
        return Err(EngineError::WaccBelowTerminalGrowth {
            wacc: a.wacc,
            terminal_growth: a.terminal_growth_rate,
        });
    }
    Ok(())
}

/// Compound a starting value along a growth path.
fn compound(start: f64, rates: &[f64]) -> Vec<f64> {
    rates
        .iter()
        .scan(start, |value, g| {
            *value *= 1.0 + g;
            Some(*value)
        })
        .collect()
}

/// Projected EBITDA in the final year for the exit-multiple method.
fn terminal_ebitda(
    a: &DcfAssumptions,
    projected_fcf: &[f64],
    ebitda_growth_rates: Option<&[f64]>,
    fcf_to_ebitda: Option<f64>,
) -> f64 {
    let final_fcf = projected_fcf.last().copied().unwrap_or(a.base_fcf);
    let base_ebitda = a.base_ebitda.filter(|e| *e > 0.0);

    if let (Some(base), Some(rates)) = (base_ebitda, ebitda_growth_rates) {
        if !rates.is_empty() {
            return compound(base, rates).last().copied().unwrap_or(base);
        }
    }
    if let Some(ratio) = fcf_to_ebitda.filter(|r| r.is_finite() && *r > 0.0) {
        return final_fcf / ratio;
    }
    match base_ebitda {
        Some(base) => compound(base, &a.growth_rates).last().copied().unwrap_or(base),
        None => final_fcf,
    }
}

/// Run a DCF.
pub fn calculate_dcf(a: &DcfAssumptions) -> EngineResult<DcfResult> {
    validate(a)?;

    let projected_fcf = compound(a.base_fcf, &a.growth_rates);
    let present_values: Vec<f64> = projected_fcf
        .iter()
        .enumerate()
        .map(|(i, fcf)| {
            let year = (i + 1) as f64;
            let period = if a.mid_year_convention { year - 0.5 } else { year };
            fcf / (1.0 + a.wacc).powf(period)
        })
        .collect();
    let sum_pv_fcf: f64 = present_values.iter().sum();

    let final_fcf = projected_fcf.last().copied().unwrap_or(a.base_fcf);
    let terminal_value = match &a.terminal_method {
        TerminalValueMethod::GordonGrowth => {
            final_fcf * (1.0 + a.terminal_growth_rate) / (a.wacc - a.terminal_growth_rate)
        }
        TerminalValueMethod::ExitMultiple {
            multiple,
            ebitda_growth_rates,
            fcf_to_ebitda,
        } => {
            if !multiple.is_finite() || *multiple <= 0.0 {
                return Err(EngineError::invalid("exit_multiple", "must be positive"));
            }
            terminal_ebitda(a, &projected_fcf, ebitda_growth_rates.as_deref(), *fcf_to_ebitda)
                * multiple
        }
    };

    let years = projected_fcf.len() as f64;
    let pv_terminal_value = terminal_value / (1.0 + a.wacc).powf(years);
    let enterprise_value = sum_pv_fcf + pv_terminal_value;
    let equity_value = enterprise_value - a.net_debt;
    let implied_multiple = a
        .base_ebitda
        .filter(|e| *e > 0.0)
        .map(|e| enterprise_value / e);

    Ok(DcfResult {
        projected_fcf,
        present_values,
        sum_pv_fcf,
        terminal_value,
        pv_terminal_value,
        enterprise_value,
        net_debt: a.net_debt,
        equity_value,
        implied_multiple,
        wacc: a.wacc,
        terminal_growth_rate: a.terminal_growth_rate,
    })
}

// ============================================================================
// Sensitivity
// ============================================================================

/// Enterprise value over a WACC × terminal-growth grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub wacc_values: Vec<f64>,
    pub growth_values: Vec<f64>,
    /// `values[i][j]` is the EV at `wacc_values[i]` and `growth_values[j]`;
    /// `None` where the DCF refuses to compute
    pub values: Vec<Vec<Option<f64>>>,
}

impl SensitivityGrid {
    /// Grid of `2 × steps + 1` points per axis centred on the base case.
    pub fn around(a: &DcfAssumptions, wacc_step: f64, growth_step: f64, steps: usize) -> Self {
        let axis = |center: f64, step: f64| -> Vec<f64> {
            let steps = steps as i64;
            (-steps..=steps).map(|k| center + k as f64 * step).collect()
        };
        let wacc_values = axis(a.wacc, wacc_step);
        let growth_values = axis(a.terminal_growth_rate, growth_step);

        let values = wacc_values
            .iter()
            .map(|wacc| {
                growth_values
                    .iter()
                    .map(|g| {
                        let mut case = a.clone();
                        case.wacc = *wacc;
                        case.terminal_growth_rate = *g;
                        calculate_dcf(&case).ok().map(|r| r.enterprise_value)
                    })
                    .collect()
            })
            .collect();

        Self {
            wacc_values,
            growth_values,
            values,
        }
    }

    /// Lowest and highest computable EV in the grid.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .flatten()
            .flatten()
            .fold(None, |acc, v| match acc {
                None => Some((*v, *v)),
                Some((lo, hi)) => Some((lo.min(*v), hi.max(*v))),
            })
    }
}
