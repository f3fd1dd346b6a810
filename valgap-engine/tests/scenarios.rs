//! Reference scenarios for the valuation formulas.
//!
//! Each scenario pins a worked example end to end through the public API.

use valgap_common::config::{CategoryWeights, MonteCarloConfig};
use valgap_engine::adjustments::{RiskDiscount, RiskDiscountKind, RiskResult};
use valgap_engine::dcf::{calculate_dcf, DcfAssumptions, TerminalValueMethod};
use valgap_engine::gap::attribute_gap;
use valgap_engine::reference::{resolve_multiples, MatchLevel, MultipleRange, ReferenceTable};
use valgap_engine::scoring::{composite_score, score_categories, score_core_factors, CoreFactors};
use valgap_engine::simulation::{BoxMuller, MonteCarloSimulator};
use valgap_engine::valuation::legacy_valuation;
use valgap_engine::{AssessmentResponse, Classification, EngineError, ReadinessCategory};

use chrono::{Duration, Utc};

// ============================================================================
// Scenario A: legacy formula
// ============================================================================

#[test]
fn test_scenario_a_legacy_formula() {
    let v = legacy_valuation(1_000_000.0, &MultipleRange::default_range(), 0.6, 0.7).unwrap();

    assert!((v.base_multiple - 4.8).abs() < 1e-9);
    assert!((v.discount_fraction - 0.1855).abs() < 5e-4);
    assert!((v.final_multiple - 4.466).abs() < 1e-3);
    assert!((v.current_value - 4_466_190.0).abs() < 1_000.0);
    assert_eq!(v.potential_value, 6_000_000.0);
    assert!((v.value_gap - 1_533_810.0).abs() < 1_000.0);
}

// ============================================================================
// Scenario B: risk multiplier
// ============================================================================

#[test]
fn test_scenario_b_risk_multiplier() {
    let discount = |kind, rate| RiskDiscount {
        kind,
        name: format!("{:?}", kind),
        rate,
        explanation: String::new(),
    };
    let result = RiskResult::from_discounts(vec![
        discount(RiskDiscountKind::Marketability, 0.18),
        discount(RiskDiscountKind::KeyPerson, 0.10),
    ]);

    assert!((result.risk_multiplier - 0.738).abs() < 1e-12);
    assert!((result.risk_severity_score - 0.262).abs() < 1e-12);
}

// ============================================================================
// Scenario C: DCF guard
// ============================================================================

#[test]
fn test_scenario_c_dcf_guard() {
    let assumptions = DcfAssumptions {
        base_fcf: 250_000.0,
        growth_rates: vec![0.05, 0.045, 0.04, 0.035, 0.03],
        wacc: 0.08,
        terminal_growth_rate: 0.09,
        net_debt: 0.0,
        base_ebitda: Some(400_000.0),
        mid_year_convention: true,
        terminal_method: TerminalValueMethod::GordonGrowth,
    };

    let err = calculate_dcf(&assumptions).unwrap_err();
    assert_eq!(err.reason_code(), "wacc_below_terminal_growth");
    assert!(matches!(err, EngineError::WaccBelowTerminalGrowth { .. }));
}

// ============================================================================
// Scenario D: category attribution rounding
// ============================================================================

#[test]
fn test_scenario_d_category_attribution() {
    let raw = vec![
        (ReadinessCategory::Financial, 10.0),
        (ReadinessCategory::Transferability, 10.0),
        (ReadinessCategory::LegalTax, 5.0),
    ];
    let gaps = attribute_gap(100.0, &raw);

    assert_eq!(gaps[0].amount, 40.0);
    assert_eq!(gaps[1].amount, 40.0);
    assert_eq!(gaps[2].amount, 20.0);
    assert_eq!(gaps.iter().map(|g| g.amount).sum::<f64>(), 100.0);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_unknown_core_factors_are_neutral() {
    let factors = CoreFactors {
        revenue_model: Some("BARTER".into()),
        gross_margin_proxy: Some("SKY_HIGH".into()),
        labor_intensity: None,
        asset_intensity: Some("".into()),
        owner_involvement: Some("SOMETIMES".into()),
    };
    assert_eq!(score_core_factors(&factors).score, 0.5);
}

#[test]
fn test_resolver_defaults_without_match() {
    let table = ReferenceTable::new().with(
        MatchLevel::Sector,
        "restaurants",
        valgap_engine::reference::RawMultiples {
            ebitda_low: 2.5,
            ebitda_high: 4.5,
            revenue_low: 0.3,
            revenue_high: 0.8,
            margin_low: None,
            margin_high: None,
        },
    );
    let classification = Classification {
        sector: Some("dental_labs".into()),
        ..Default::default()
    };
    let range = resolve_multiples(&table, &classification).range;
    assert!(range.is_default);
    assert_eq!((range.ebitda_low, range.ebitda_high), (3.0, 6.0));
    assert_eq!((range.revenue_low, range.revenue_high), (0.5, 1.5));
}

#[test]
fn test_newest_response_wins_and_composite_is_bounded() {
    let now = Utc::now();
    let responses = vec![
        AssessmentResponse {
            question_id: "fin-1".into(),
            category: ReadinessCategory::Financial,
            max_points: 10.0,
            score_value: Some(1.0),
            updated_at: now,
        },
        AssessmentResponse {
            question_id: "fin-1".into(),
            category: ReadinessCategory::Financial,
            max_points: 10.0,
            score_value: Some(0.0),
            updated_at: now - Duration::days(3),
        },
        AssessmentResponse {
            question_id: "mkt-1".into(),
            category: ReadinessCategory::Market,
            max_points: 5.0,
            score_value: Some(0.4),
            updated_at: now,
        },
    ];
    let scores = score_categories(&responses, &CategoryWeights::default()).unwrap();
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].score, 1.0);

    let weight_sum: f64 = scores.iter().map(|s| s.weight).sum();
    assert!((weight_sum - 1.0).abs() < 1e-12);

    // Financial 0.25 and Market 0.15 renormalize to 0.625 / 0.375
    let composite = composite_score(&scores);
    assert!((composite - (0.625 + 0.375 * 0.4)).abs() < 1e-12);
}

#[test]
fn test_monte_carlo_converges_to_base_case() {
    let base = DcfAssumptions {
        base_fcf: 1_000_000.0,
        growth_rates: vec![0.06, 0.05, 0.04, 0.035, 0.03],
        wacc: 0.16,
        terminal_growth_rate: 0.025,
        net_debt: 0.0,
        base_ebitda: Some(1_400_000.0),
        mid_year_convention: true,
        terminal_method: TerminalValueMethod::GordonGrowth,
    };
    let simulator = MonteCarloSimulator::new(MonteCarloConfig {
        iterations: 5_000,
        wacc_std_dev: 0.02,
        growth_std_dev: 0.05,
        ..MonteCarloConfig::default()
    });

    let result = simulator.run(&base, &mut BoxMuller::seeded(31)).unwrap();
    let deviation = (result.mean - result.base_enterprise_value).abs() / result.base_enterprise_value;
    assert!(deviation < 0.10, "mean off by {:.3}", deviation);
    assert!(result.histogram.len() >= 20 && result.histogram.len() <= 25);
}
