//! Business-quality and buyer-readiness scoring.
//!
//! Both scorers are leaves of the engine: they run independently of each other
//! and their outputs feed the adjustment, risk and valuation calculations.

pub mod categories;
pub mod core_factors;

pub use categories::{composite_score, dedupe_responses, score_categories};
pub use core_factors::{
    score_core_factors, CoreFactorScore, CoreFactors, FactorScore, OwnerInvolvement,
    NEUTRAL_SCORE,
};
