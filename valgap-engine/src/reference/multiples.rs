//! Industry Multiple Resolver.
//!
//! Resolves EV/EBITDA and EV/Revenue multiple ranges for a classification via
//! the reference cascade, falling back to a fixed default range. Externally
//! supplied ranges are sanitized: reversed bounds are swapped and values outside
//! plausible bounds are clamped, each with a warning kept alongside the result.

use serde::{Deserialize, Serialize};

use super::table::{MatchLevel, ReferenceTable};
use crate::types::Classification;

/// Default EV/EBITDA range when no classification matches.
pub const DEFAULT_EBITDA_MULTIPLE: (f64, f64) = (3.0, 6.0);
/// Default EV/Revenue range when no classification matches.
pub const DEFAULT_REVENUE_MULTIPLE: (f64, f64) = (0.5, 1.5);

/// Plausible EV/EBITDA bounds for reference data.
pub const EBITDA_MULTIPLE_BOUNDS: (f64, f64) = (1.5, 15.0);
/// Plausible EV/Revenue bounds for reference data.
pub const REVENUE_MULTIPLE_BOUNDS: (f64, f64) = (0.1, 8.0);

/// Multiple range row as stored in reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMultiples {
    pub ebitda_low: f64,
    pub ebitda_high: f64,
    pub revenue_low: f64,
    pub revenue_high: f64,
    #[serde(default)]
    pub margin_low: Option<f64>,
    #[serde(default)]
    pub margin_high: Option<f64>,
}

/// Typical EBITDA margin band for the industry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginRange {
    pub low: f64,
    pub high: f64,
}

/// Sanitized multiple range used by the valuation formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleRange {
    pub ebitda_low: f64,
    pub ebitda_high: f64,
    pub revenue_low: f64,
    pub revenue_high: f64,
    pub margin_range: Option<MarginRange>,
    pub match_level: MatchLevel,
    pub is_default: bool,
}

impl MultipleRange {
    /// The fixed fallback range.
    pub fn default_range() -> Self {
        Self {
            ebitda_low: DEFAULT_EBITDA_MULTIPLE.0,
            ebitda_high: DEFAULT_EBITDA_MULTIPLE.1,
            revenue_low: DEFAULT_REVENUE_MULTIPLE.0,
            revenue_high: DEFAULT_REVENUE_MULTIPLE.1,
            margin_range: None,
            match_level: MatchLevel::Default,
            is_default: true,
        }
    }

    /// Midpoint of the EBITDA multiple range.
    pub fn ebitda_median(&self) -> f64 {
        (self.ebitda_low + self.ebitda_high) / 2.0
    }
}

/// Resolver output: the range plus any sanitization warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMultiples {
    pub range: MultipleRange,
    pub warnings: Vec<String>,
}

/// Resolve multiples for a classification.
pub fn resolve_multiples(
    table: &ReferenceTable<RawMultiples>,
    classification: &Classification,
) -> ResolvedMultiples {
    match table.resolve(classification) {
        Some((level, raw)) => {
            let mut warnings = Vec::new();
            let (ebitda_low, ebitda_high) = sanitize_pair(
                "EBITDA multiple",
                (raw.ebitda_low, raw.ebitda_high),
                EBITDA_MULTIPLE_BOUNDS,
                DEFAULT_EBITDA_MULTIPLE,
                &mut warnings,
            );
            let (revenue_low, revenue_high) = sanitize_pair(
                "revenue multiple",
                (raw.revenue_low, raw.revenue_high),
                REVENUE_MULTIPLE_BOUNDS,
                DEFAULT_REVENUE_MULTIPLE,
                &mut warnings,
            );
            let margin_range = match (raw.margin_low, raw.margin_high) {
                (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some(MarginRange {
                    low: a.min(b),
                    high: a.max(b),
                }),
                _ => None,
            };

            for warning in &warnings {
                tracing::warn!(match_level = %level, "{}", warning);
            }

            ResolvedMultiples {
                range: MultipleRange {
                    ebitda_low,
                    ebitda_high,
                    revenue_low,
                    revenue_high,
                    margin_range,
                    match_level: level,
                    is_default: false,
                },
                warnings,
            }
        }
        None => {
            tracing::debug!("No industry multiple match, using default range");
            ResolvedMultiples {
                range: MultipleRange::default_range(),
                warnings: Vec::new(),
            }
        }
    }
}

fn sanitize_pair(
    label: &str,
    (low, high): (f64, f64),
    (min, max): (f64, f64),
    fallback: (f64, f64),
    warnings: &mut Vec<String>,
) -> (f64, f64) {
    if !low.is_finite() || !high.is_finite() {
        warnings.push(format!(
            "{} range ({}, {}) is not numeric; using default {}-{}",
            label, low, high, fallback.0, fallback.1
        ));
        return fallback;
    }

    let (mut low, mut high) = (low, high);
    if low > high {
        warnings.push(format!("{} range reversed ({} > {}); swapped", label, low, high));
        std::mem::swap(&mut low, &mut high);
    }

    let clamped_low = low.clamp(min, max);
    let clamped_high = high.clamp(min, max);
    if clamped_low != low || clamped_high != high {
        warnings.push(format!(
            "{} range {}-{} outside bounds {}-{}; clamped to {}-{}",
            label, low, high, min, max, clamped_low, clamped_high
        ));
    }

    (clamped_low, clamped_high)
}
