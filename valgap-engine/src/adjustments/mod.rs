//! Multiple adjustments and risk discounts.
//!
//! Two independent bundles computed from the same profile: [`quality`] moves the
//! company within its industry range additively, [`risk`] applies acquisition
//! risk multiplicatively.

pub mod quality;
pub mod risk;

pub use quality::{
    business_quality_score, compute_adjustments, size_discount, AdjustmentCategory,
    AdjustmentFactor, AdjustmentResult, MultipleAdjustment, MAX_ADJUSTMENT_MULTIPLIER,
    MIN_ADJUSTMENT_MULTIPLIER,
};
pub use risk::{
    compute_risk_discounts, dlom_rate, key_person_rate, risk_multiplier, RiskDiscount,
    RiskDiscountKind, RiskInputs, RiskResult,
};
