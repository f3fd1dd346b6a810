//! Recalculation orchestrator and collaborator interfaces.
//!
//! The engine performs no I/O itself. Company data, snapshot persistence and
//! downstream notifications come in through the traits defined here; the
//! service wires them around [`ValuationEngine`] and appends one snapshot per
//! recalculation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::Instrument;
use valgap_common::config::Config;
use valgap_common::logging::generate_trace_id;

use crate::dcf::DcfAssumptions;
use crate::engine::ValuationEngine;
use crate::error::EngineResult;
use crate::reference::ReferenceData;
use crate::simulation::{
    BoxMuller, CancellationFlag, MonteCarloSimulator, SimulationProgress, SimulationResult,
};
use crate::snapshot::ValuationSnapshot;
use crate::types::{AssessmentResponse, CompanyRecord, FinancialPeriod};

// ============================================================================
// Collaborator Interfaces
// ============================================================================

/// Source of company records, financial history and assessment answers.
#[async_trait]
pub trait CompanyDataSource: Send + Sync {
    /// Company record, or `None` when the id is unknown.
    async fn company(&self, company_id: &str) -> Result<Option<CompanyRecord>>;

    /// Annual financial periods, any order.
    async fn financial_periods(&self, company_id: &str) -> Result<Vec<FinancialPeriod>>;

    /// Assessment responses, newest first.
    async fn assessment_responses(&self, company_id: &str) -> Result<Vec<AssessmentResponse>>;
}

/// Append-only snapshot persistence.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn append(&self, snapshot: &ValuationSnapshot) -> Result<()>;

    /// Snapshot with the latest creation time for a company.
    async fn latest(&self, company_id: &str) -> Result<Option<ValuationSnapshot>>;
}

/// Receives figures other parts of the system keep in sync.
#[async_trait]
pub trait RecalculationSink: Send + Sync {
    /// New deal-readiness score.
    async fn readiness_updated(&self, company_id: &str, score: f64) -> Result<()>;

    /// New total gap, used to rescale task dollar values.
    async fn total_gap_updated(&self, company_id: &str, total_gap: f64) -> Result<()>;
}

// ============================================================================
// Valuation Service
// ============================================================================

/// Recalculation orchestrator.
pub struct ValuationService {
    engine: ValuationEngine,
    simulator: MonteCarloSimulator,
    data: Arc<dyn CompanyDataSource>,
    store: Arc<dyn SnapshotStore>,
    sink: Arc<dyn RecalculationSink>,
    cancel: CancellationFlag,
}

impl ValuationService {
    pub fn new(
        config: Config,
        reference: ReferenceData,
        data: Arc<dyn CompanyDataSource>,
        store: Arc<dyn SnapshotStore>,
        sink: Arc<dyn RecalculationSink>,
    ) -> Self {
        let simulator = MonteCarloSimulator::new(config.monte_carlo.clone());
        Self {
            engine: ValuationEngine::new(config, reference),
            simulator,
            data,
            store,
            sink,
            cancel: CancellationFlag::new(),
        }
    }

    /// Build from validated configuration, loading reference data from the
    /// configured path when one is set.
    pub fn from_config(
        config: Config,
        data: Arc<dyn CompanyDataSource>,
        store: Arc<dyn SnapshotStore>,
        sink: Arc<dyn RecalculationSink>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        let reference = match config.valuation.reference_data_path.as_deref() {
            Some(path) => ReferenceData::load_from(path)
                .with_context(|| format!("Failed to load reference data from {}", path.display()))?,
            None => {
                tracing::info!("No reference data configured, using default multiples");
                ReferenceData::default()
            }
        };
        Ok(Self::new(config, reference, data, store, sink))
    }

    pub fn engine(&self) -> &ValuationEngine {
        &self.engine
    }

    /// Flag that stops the in-flight simulation at its next chunk boundary.
    ///
    /// A cancellation applies to one run: the flag is cleared when that
    /// simulation ends.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Recalculate a company and append the resulting snapshot.
    pub async fn recalculate(&self, company_id: &str) -> Result<ValuationSnapshot> {
        let trace_id = generate_trace_id();
        let span = tracing::info_span!("recalculate", company_id = %company_id, trace_id = %trace_id);
        self.recalculate_inner(company_id).instrument(span).await
    }

    async fn recalculate_inner(&self, company_id: &str) -> Result<ValuationSnapshot> {
        let company = self
            .data
            .company(company_id)
            .await
            .context("Failed to load company")?
            .with_context(|| format!("Company not found: {}", company_id))?;
        let periods = self
            .data
            .financial_periods(company_id)
            .await
            .context("Failed to load financial periods")?;
        let responses = self
            .data
            .assessment_responses(company_id)
            .await
            .context("Failed to load assessment responses")?;

        let mut valuation = self.engine.evaluate(&company, &periods, &responses)?;

        if let Some(check) = valuation.dcf.as_mut() {
            match self.simulate(&check.assumptions).await {
                Ok(result) => check.simulation = result,
                Err(e) => {
                    tracing::warn!(reason = e.reason_code(), error = %e, "Monte Carlo simulation skipped");
                    valuation
                        .warnings
                        .push(format!("Monte Carlo simulation unavailable: {}", e));
                }
            }
        }

        let snapshot = ValuationSnapshot::record(&company, valuation);
        self.store
            .append(&snapshot)
            .await
            .context("Failed to append valuation snapshot")?;

        tracing::info!(
            snapshot_id = %snapshot.id,
            ev_mid = snapshot.valuation.canonical.ev_mid,
            total_gap = snapshot.total_gap(),
            readiness = snapshot.readiness_score(),
            warnings = snapshot.valuation.warnings.len(),
            "Valuation snapshot written"
        );

        self.sink
            .readiness_updated(company_id, snapshot.readiness_score())
            .await
            .context("Failed to publish readiness score")?;
        self.sink
            .total_gap_updated(company_id, snapshot.total_gap())
            .await
            .context("Failed to publish total gap")?;

        Ok(snapshot)
    }

    /// Run the simulator around a DCF base case, if simulation is enabled.
    async fn simulate(&self, base: &DcfAssumptions) -> EngineResult<Option<SimulationResult>> {
        if self.simulator.config().iterations == 0 {
            return Ok(None);
        }
        let mut source = match self.simulator.config().seed {
            Some(seed) => BoxMuller::seeded(seed),
            None => BoxMuller::from_entropy(),
        };
        let result = self
            .simulator
            .run_chunked(
                base,
                &mut source,
                Some(&self.cancel),
                Some(|p: SimulationProgress| {
                    tracing::trace!(completed = p.completed, total = p.total, "Simulation progress");
                }),
            )
            .await;
        self.cancel.reset();
        Ok(Some(result?))
    }
}
