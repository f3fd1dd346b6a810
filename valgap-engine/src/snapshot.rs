//! Immutable valuation snapshots.
//!
//! One snapshot is appended per recalculation and never modified. The current
//! state of a company is its snapshot with the latest `created_at`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::Valuation;
use crate::types::CompanyRecord;

/// Append-only record of one calculation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSnapshot {
    pub id: Uuid,
    pub company_id: String,
    pub created_at: DateTime<Utc>,
    /// Company inputs as they were at calculation time
    pub company: CompanyRecord,
    #[serde(flatten)]
    pub valuation: Valuation,
}

impl ValuationSnapshot {
    /// Create a snapshot stamped now.
    pub fn record(company: &CompanyRecord, valuation: Valuation) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id: company.id.clone(),
            created_at: Utc::now(),
            company: company.clone(),
            valuation,
        }
    }

    /// Canonical EV range (low, mid, high).
    pub fn ev_range(&self) -> (f64, f64, f64) {
        let c = &self.valuation.canonical;
        (c.ev_low, c.ev_mid, c.ev_high)
    }

    pub fn total_gap(&self) -> f64 {
        self.valuation.gap.total_gap
    }

    pub fn readiness_score(&self) -> f64 {
        self.valuation.composite_readiness
    }
}

/// The latest snapshot for a company.
pub fn current_snapshot<'a>(
    snapshots: &'a [ValuationSnapshot],
    company_id: &str,
) -> Option<&'a ValuationSnapshot> {
    snapshots
        .iter()
        .filter(|s| s.company_id == company_id)
        .max_by_key(|s| s.created_at)
}

/// Change between two snapshots of the same company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDelta {
    pub from: Uuid,
    pub to: Uuid,
    pub ev_mid_change: f64,
    pub total_gap_change: f64,
    pub readiness_change: f64,
    pub elapsed_seconds: i64,
}

impl SnapshotDelta {
    pub fn between(earlier: &ValuationSnapshot, later: &ValuationSnapshot) -> Self {
        let elapsed: Duration = later.created_at - earlier.created_at;
        Self {
            from: earlier.id,
            to: later.id,
            ev_mid_change: later.valuation.canonical.ev_mid - earlier.valuation.canonical.ev_mid,
            total_gap_change: later.total_gap() - earlier.total_gap(),
            readiness_change: later.readiness_score() - earlier.readiness_score(),
            elapsed_seconds: elapsed.num_seconds(),
        }
    }

    /// Whether the gap narrowed.
    pub fn improved(&self) -> bool {
        self.total_gap_change < 0.0
    }
}
