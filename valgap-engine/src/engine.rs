//! Valuation engine: runs the full calculation chain for one company.
//!
//! Scoring, multiple resolution, adjustments, both valuation formulas and the
//! gap decomposition always run. The DCF cross-check is optional: when it
//! cannot be computed the reason is logged and recorded as a warning, and the
//! multiple-based valuation is returned without it.

use serde::{Deserialize, Serialize};
use valgap_common::config::Config;

use crate::adjustments::{
    compute_adjustments, compute_risk_discounts, AdjustmentFactor, AdjustmentResult, RiskInputs,
    RiskResult,
};
use crate::dcf::{
    calculate_dcf, DcfAssumptions, DcfResult, SensitivityGrid, WaccBreakdown, WaccEngine,
    WaccInputs,
};
use crate::error::EngineResult;
use crate::gap::{decompose_gap, GapDecomposition};
use crate::reference::{MultipleRange, ReferenceData};
use crate::scoring::{composite_score, score_categories, score_core_factors, CoreFactorScore};
use crate::simulation::SimulationResult;
use crate::types::{
    category_score, AssessmentResponse, CategoryScore, CompanyRecord, FinancialPeriod,
    ReadinessCategory,
};
use crate::valuation::{CanonicalValuation, LegacyValuation, ValuationCalculator, ValuationInputs};

/// Sensitivity grid steps around the base case.
const SENSITIVITY_WACC_STEP: f64 = 0.01;
const SENSITIVITY_GROWTH_STEP: f64 = 0.005;
const SENSITIVITY_STEPS: usize = 2;

/// DCF cross-check fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfCrossCheck {
    pub wacc: WaccBreakdown,
    pub assumptions: DcfAssumptions,
    pub result: DcfResult,
    pub sensitivity: SensitivityGrid,
    /// Filled in when the simulator ran
    #[serde(default)]
    pub simulation: Option<SimulationResult>,
}

/// Everything one calculation run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub core_score: CoreFactorScore,
    pub category_scores: Vec<CategoryScore>,
    pub composite_readiness: f64,
    pub multiples: MultipleRange,
    pub adjustments: AdjustmentResult,
    pub business_quality_score: f64,
    pub risk: RiskResult,
    pub legacy: LegacyValuation,
    pub canonical: CanonicalValuation,
    pub gap: GapDecomposition,
    #[serde(default)]
    pub dcf: Option<DcfCrossCheck>,
    /// The DCF cross-check was skipped because the company's DCF is manually configured
    #[serde(default)]
    pub dcf_skipped_manual: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// The calculation chain with its configuration and reference data.
#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    config: Config,
    reference: ReferenceData,
}

impl ValuationEngine {
    pub fn new(config: Config, reference: ReferenceData) -> Self {
        Self { config, reference }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Run the full chain for a company.
    ///
    /// Fails only when the primary valuation cannot be produced, which means
    /// no usable assessment responses or malformed numeric input.
    pub fn evaluate(
        &self,
        company: &CompanyRecord,
        periods: &[FinancialPeriod],
        responses: &[AssessmentResponse],
    ) -> EngineResult<Valuation> {
        let profile = company.effective_profile();
        let mut warnings = Vec::new();

        let core_score = score_core_factors(&company.core_factors);
        let category_scores = score_categories(responses, &self.config.valuation.category_weights)?;
        let composite_readiness = composite_score(&category_scores);

        let resolved = self.reference.multiples_for(&company.classification);
        warnings.extend(resolved.warnings);
        let multiples = resolved.range;

        let transferability = category_score(&category_scores, ReadinessCategory::Transferability);
        let disabled = AdjustmentFactor::parse_list(&self.config.valuation.disabled_adjustments);
        let adjustments = compute_adjustments(&profile, transferability, &disabled);
        let business_quality_score = adjustments.business_quality_score();

        let risk = compute_risk_discounts(
            &profile,
            &RiskInputs {
                owner_involvement: company.core_factors.owner_involvement(),
                transferability_score: transferability,
                financial_score: category_score(&category_scores, ReadinessCategory::Financial),
                legal_tax_score: category_score(&category_scores, ReadinessCategory::LegalTax),
            },
        );

        let result = ValuationCalculator::with_spread(self.config.valuation.spread_factor)
            .calculate(&ValuationInputs {
                ebitda: profile.ebitda,
                range: multiples.clone(),
                core_score: core_score.score,
                composite_readiness,
                adjustment_multiplier: adjustments.adjustment_multiplier,
                risk_multiplier: risk.risk_multiplier,
            })?;

        let gap = decompose_gap(
            profile.ebitda,
            &multiples,
            &result.canonical,
            &adjustments,
            &risk,
            &category_scores,
        );

        let dcf = if company.dcf_manually_configured {
            tracing::debug!(company_id = %company.id, "DCF manually configured, skipping cross-check");
            None
        } else {
            match self.dcf_cross_check(company, periods, composite_readiness) {
                Ok(check) => Some(check),
                Err(e) => {
                    tracing::warn!(
                        company_id = %company.id,
                        reason = e.reason_code(),
                        error = %e,
                        "DCF cross-check unavailable"
                    );
                    warnings.push(format!("DCF cross-check unavailable: {}", e));
                    None
                }
            }
        };

        Ok(Valuation {
            core_score,
            category_scores,
            composite_readiness,
            multiples,
            adjustments,
            business_quality_score,
            risk,
            legacy: result.legacy,
            canonical: result.canonical,
            gap,
            dcf,
            dcf_skipped_manual: company.dcf_manually_configured,
            warnings,
        })
    }

    /// WACC, DCF and sensitivity grid from the company's history.
    pub fn dcf_cross_check(
        &self,
        company: &CompanyRecord,
        periods: &[FinancialPeriod],
        readiness: f64,
    ) -> EngineResult<DcfCrossCheck> {
        let wacc = WaccEngine::new(self.config.wacc.clone()).compute(
            &WaccInputs {
                ebitda: company.profile.ebitda,
                readiness_score: Some(readiness),
                beta: self.reference.beta_for(&company.classification),
                ..Default::default()
            }
            .with_periods(periods),
        )?;
        let assumptions = DcfAssumptions::from_history(periods, wacc.wacc, &self.config.dcf)?;
        let result = calculate_dcf(&assumptions)?;
        let sensitivity = SensitivityGrid::around(
            &assumptions,
            SENSITIVITY_WACC_STEP,
            SENSITIVITY_GROWTH_STEP,
            SENSITIVITY_STEPS,
        );

        Ok(DcfCrossCheck {
            wacc,
            assumptions,
            result,
            sensitivity,
            simulation: None,
        })
    }
}
