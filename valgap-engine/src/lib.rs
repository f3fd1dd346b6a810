//! valgap Engine
//!
//! Estimates a private company's enterprise value and explains why it sits
//! below its theoretical ceiling.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         ValuationService                             │
//! │   CompanyDataSource ──► ValuationEngine ──► SnapshotStore / Sink     │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐    │
//! │  │ Core factors │  │ Categories   │  │ Reference multiples      │    │
//! │  └──────┬───────┘  └──────┬───────┘  └────────────┬─────────────┘    │
//! │         └──────────┬──────┴───────────────────────┘                  │
//! │         ┌──────────▼──────────┐  ┌──────────────────────────┐        │
//! │         │ Adjustments / Risk  │  │ WACC → DCF → Monte Carlo │        │
//! │         └──────────┬──────────┘  └──────────────────────────┘        │
//! │         ┌──────────▼──────────┐                                      │
//! │         │ Valuation (legacy + │                                      │
//! │         │ canonical) → Gap    │                                      │
//! │         └─────────────────────┘                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Two valuation formulas
//! - **Legacy**: core-factor position in the range, discounted by readiness
//! - **Canonical**: range median × quality multiplier × risk multiplier
//!
//! Both are computed on every run and stored side by side on the snapshot.
//!
//! ## Value gap
//! - **Addressable**: recoverable by fixing addressable risks
//! - **Structural**: lost to marketability, not fixable without a transaction
//! - **Aspirational**: reachable only with top-quartile quality

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod adjustments;
pub mod dcf;
pub mod engine;
pub mod error;
pub mod gap;
pub mod reference;
pub mod scoring;
pub mod service;
pub mod simulation;
pub mod snapshot;
pub mod types;
pub mod valuation;

pub use engine::{DcfCrossCheck, Valuation, ValuationEngine};
pub use error::{EngineError, EngineResult};
pub use service::{CompanyDataSource, RecalculationSink, SnapshotStore, ValuationService};
pub use snapshot::{current_snapshot, SnapshotDelta, ValuationSnapshot};
pub use types::{
    AssessmentResponse, CategoryScore, Classification, CompanyRecord, FinancialPeriod,
    FinancialProfile, ReadinessCategory, RevenueModel, SizeCategory,
};
