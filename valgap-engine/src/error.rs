//! Tagged failures for engine calculations.
//!
//! Every calculation that can refuse to produce a number returns
//! [`EngineResult`]. Expected missing-data conditions are ordinary variants with a
//! stable reason code, so callers can branch on them without string matching.

use thiserror::Error;

/// Result type alias for engine calculations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Engine calculation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// No usable free-cash-flow history
    #[error("No cash flow data available")]
    NoCashFlowData,

    /// Latest free cash flow is zero or negative, so a DCF is meaningless
    #[error("Free cash flow is not positive: {fcf}")]
    NegativeFcf { fcf: f64 },

    /// Gordon growth terminal value undefined
    #[error("WACC {wacc:.4} does not exceed terminal growth {terminal_growth:.4}")]
    WaccBelowTerminalGrowth { wacc: f64, terminal_growth: f64 },

    /// No answered assessment responses
    #[error("No assessment responses available")]
    NoAssessmentResponses,

    /// EBITDA is zero or negative where a positive figure is required
    #[error("EBITDA is not positive: {ebitda}")]
    NonPositiveEbitda { ebitda: f64 },

    /// Malformed numeric input
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Every Monte Carlo run was discarded
    #[error("No valid simulation runs out of {attempted}")]
    NoValidSimulations { attempted: usize },

    /// Simulation stopped through its cancellation flag
    #[error("Simulation cancelled after {completed} iterations")]
    SimulationCancelled { completed: usize },
}

impl EngineError {
    /// Stable snake_case reason code for persistence and API responses.
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::NoCashFlowData => "no_cash_flow_data",
            Self::NegativeFcf { .. } => "negative_fcf",
            Self::WaccBelowTerminalGrowth { .. } => "wacc_below_terminal_growth",
            Self::NoAssessmentResponses => "no_assessment_responses",
            Self::NonPositiveEbitda { .. } => "non_positive_ebitda",
            Self::InvalidInput { .. } => "invalid_input",
            Self::NoValidSimulations { .. } => "no_valid_simulations",
            Self::SimulationCancelled { .. } => "simulation_cancelled",
        }
    }

    /// Whether this failure comes from absent or insufficient data rather than bad input.
    pub const fn is_missing_data(&self) -> bool {
        matches!(
            self,
            Self::NoCashFlowData | Self::NegativeFcf { .. } | Self::NoAssessmentResponses
        )
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
