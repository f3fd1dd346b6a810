//! DCF assumptions and their derivation from cash-flow history.

use serde::{Deserialize, Serialize};
use valgap_common::config::DcfConfig;

use crate::error::{EngineError, EngineResult};
use crate::types::FinancialPeriod;

/// Bounds on the starting growth rate derived from history.
const HISTORICAL_GROWTH_BOUNDS: (f64, f64) = (-0.10, 0.25);

/// How the terminal value is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TerminalValueMethod {
    /// `TV = FCF_N × (1 + g) / (WACC - g)`
    GordonGrowth,
    /// `TV = EBITDA_N × multiple`
    ExitMultiple {
        multiple: f64,
        /// Explicit EBITDA growth path, one rate per projection year
        #[serde(default)]
        ebitda_growth_rates: Option<Vec<f64>>,
        /// FCF / EBITDA conversion ratio
        #[serde(default)]
        fcf_to_ebitda: Option<f64>,
    },
}

impl Default for TerminalValueMethod {
    fn default() -> Self {
        Self::GordonGrowth
    }
}

/// Everything the DCF calculator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    /// Base-year free cash flow
    pub base_fcf: f64,
    /// One growth rate per projection year
    pub growth_rates: Vec<f64>,
    pub wacc: f64,
    pub terminal_growth_rate: f64,
    /// Total debt minus cash from the latest balance sheet
    pub net_debt: f64,
    /// Base-year EBITDA, used for the implied multiple and exit-multiple terminal value
    #[serde(default)]
    pub base_ebitda: Option<f64>,
    #[serde(default = "default_mid_year")]
    pub mid_year_convention: bool,
    #[serde(default)]
    pub terminal_method: TerminalValueMethod,
}

fn default_mid_year() -> bool {
    true
}

impl DcfAssumptions {
    /// Assumptions with the configured default growth path and terminal rate.
    pub fn new(base_fcf: f64, wacc: f64, config: &DcfConfig) -> Self {
        Self {
            base_fcf,
            growth_rates: config.default_growth_rates.clone(),
            wacc,
            terminal_growth_rate: config.terminal_growth_rate,
            net_debt: 0.0,
            base_ebitda: None,
            mid_year_convention: config.mid_year_convention,
            terminal_method: TerminalValueMethod::GordonGrowth,
        }
    }

    /// Derive assumptions from annual financial periods.
    ///
    /// The latest period with a free cash flow figure is the base year. With at
    /// least two years of history the growth path starts at the median
    /// year-over-year FCF growth and tapers linearly to the terminal rate;
    /// otherwise the configured default path is used.
    pub fn from_history(
        periods: &[FinancialPeriod],
        wacc: f64,
        config: &DcfConfig,
    ) -> EngineResult<Self> {
        let mut sorted: Vec<&FinancialPeriod> = periods.iter().collect();
        sorted.sort_by_key(|p| p.fiscal_year);

        let history: Vec<(i32, f64)> = sorted
            .iter()
            .filter_map(|p| {
                p.free_cash_flow()
                    .filter(|fcf| fcf.is_finite())
                    .map(|fcf| (p.fiscal_year, fcf))
            })
            .collect();

        let (_, base_fcf) = *history.last().ok_or(EngineError::NoCashFlowData)?;
        if base_fcf <= 0.0 {
            return Err(EngineError::NegativeFcf { fcf: base_fcf });
        }

        let horizon = config.default_growth_rates.len().max(1);
        let growth_rates = match median_growth(&history) {
            Some(start) => taper(
                start.clamp(HISTORICAL_GROWTH_BOUNDS.0, HISTORICAL_GROWTH_BOUNDS.1),
                config.terminal_growth_rate,
                horizon,
            ),
            None => config.default_growth_rates.clone(),
        };

        let latest = sorted.last().copied();
        let net_debt = latest.map(|p| p.net_debt()).unwrap_or(0.0);
        let base_ebitda = latest.map(|p| p.ebitda).filter(|e| *e > 0.0);

        tracing::debug!(
            years = history.len(),
            base_fcf,
            first_year_growth = growth_rates.first().copied().unwrap_or_default(),
            net_debt,
            "Derived DCF assumptions from history"
        );

        Ok(Self {
            base_fcf,
            growth_rates,
            wacc,
            terminal_growth_rate: config.terminal_growth_rate,
            net_debt,
            base_ebitda,
            mid_year_convention: config.mid_year_convention,
            terminal_method: TerminalValueMethod::GordonGrowth,
        })
    }

    pub fn with_terminal_method(mut self, method: TerminalValueMethod) -> Self {
        self.terminal_method = method;
        self
    }

    pub fn projection_years(&self) -> usize {
        self.growth_rates.len()
    }
}

/// Median year-over-year growth over consecutive years with a positive prior FCF.
fn median_growth(history: &[(i32, f64)]) -> Option<f64> {
    let mut rates: Vec<f64> = history
        .windows(2)
        .filter(|w| w[1].0 - w[0].0 == 1 && w[0].1 > 0.0)
        .map(|w| (w[1].1 - w[0].1) / w[0].1)
        .collect();
    if rates.is_empty() {
        return None;
    }
    rates.sort_by(|a, b| a.total_cmp(b));
    let mid = rates.len() / 2;
    Some(if rates.len() % 2 == 0 {
        (rates[mid - 1] + rates[mid]) / 2.0
    } else {
        rates[mid]
    })
}

/// Linear path from `start` in year one to `end` in the final year.
fn taper(start: f64, end: f64, years: usize) -> Vec<f64> {
    if years == 1 {
        return vec![start];
    }
    (0..years)
        .map(|i| start + (end - start) * i as f64 / (years - 1) as f64)
        .collect()
}
