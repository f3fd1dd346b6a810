//! Discount-rate build-up and discounted cash flow cross-check.
//!
//! The DCF runs independently of the multiple-based valuation. Its output is an
//! optional cross-check on the snapshot, never a prerequisite for it.

pub mod calculator;
pub mod projection;
pub mod wacc;

pub use calculator::{calculate_dcf, DcfResult, SensitivityGrid};
pub use projection::{DcfAssumptions, TerminalValueMethod};
pub use wacc::{
    company_specific_risk, interpolate_size_premium, EbitdaTier, RateSource, TierParameters,
    WaccBreakdown, WaccEngine, WaccInputs,
};
