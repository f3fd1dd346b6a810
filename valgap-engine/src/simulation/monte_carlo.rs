//! Monte Carlo Simulator.
//!
//! Runs independent DCF evaluations around a base case, each sampling WACC,
//! every year's growth rate and the terminal growth rate from normal
//! distributions centred on the base values:
//!
//! | Input | Clamp |
//! |-------|-------|
//! | WACC | [5%, 25%] |
//! | Growth (each year) | [-20%, 30%] |
//! | Terminal growth | [0.5%, sampled WACC - 1%] |
//!
//! Runs the DCF refuses, and runs with EV ≥ 1000 × base FCF, are discarded.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use valgap_common::config::MonteCarloConfig;

use super::normal::NormalSource;
use crate::dcf::{calculate_dcf, DcfAssumptions};
use crate::error::{EngineError, EngineResult};

const WACC_BOUNDS: (f64, f64) = (0.05, 0.25);
const GROWTH_BOUNDS: (f64, f64) = (-0.20, 0.30);
const MIN_TERMINAL_GROWTH: f64 = 0.005;
const TERMINAL_GROWTH_WACC_GAP: f64 = 0.01;
const IMPLAUSIBLE_EV_MULTIPLE: f64 = 1000.0;

// ============================================================================
// Result Types
// ============================================================================

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Distribution of simulated enterprise values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub iterations: usize,
    pub valid_iterations: usize,
    pub discarded: usize,
    pub base_enterprise_value: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub p5: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
    pub histogram: Vec<HistogramBin>,
}

/// Progress report delivered after each chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationProgress {
    pub completed: usize,
    pub total: usize,
}

impl SimulationProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Cooperative cancellation, checked between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a cancellation so the flag can govern the next run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Simulator
// ============================================================================

/// Monte Carlo simulator over the DCF.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloSimulator {
    config: MonteCarloConfig,
}

impl MonteCarloSimulator {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Run every iteration in one pass.
    pub fn run<S: NormalSource + ?Sized>(
        &self,
        base: &DcfAssumptions,
        source: &mut S,
    ) -> EngineResult<SimulationResult> {
        let base_ev = calculate_dcf(base)?.enterprise_value;
        let limit = base.base_fcf * IMPLAUSIBLE_EV_MULTIPLE;

        let mut values = Vec::with_capacity(self.config.iterations);
        for _ in 0..self.config.iterations {
            if let Some(ev) = self.iterate(base, source, limit) {
                values.push(ev);
            }
        }
        self.summarize(values, base_ev)
    }

    /// Run in chunks, yielding to the scheduler between chunks.
    ///
    /// Cancellation is checked between chunks, and `progress` is called after
    /// each one.
    pub async fn run_chunked<S, F>(
        &self,
        base: &DcfAssumptions,
        source: &mut S,
        cancel: Option<&CancellationFlag>,
        progress: Option<F>,
    ) -> EngineResult<SimulationResult>
    where
        S: NormalSource + ?Sized,
        F: Fn(SimulationProgress) + Send,
    {
        let base_ev = calculate_dcf(base)?.enterprise_value;
        let limit = base.base_fcf * IMPLAUSIBLE_EV_MULTIPLE;
        let total = self.config.iterations;
        let chunk_size = self.config.chunk_size.max(1);

        let mut values = Vec::with_capacity(total);
        let mut completed = 0;
        while completed < total {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                tracing::warn!(completed, total, "Monte Carlo simulation cancelled");
                return Err(EngineError::SimulationCancelled { completed });
            }

            let end = (completed + chunk_size).min(total);
            for _ in completed..end {
                if let Some(ev) = self.iterate(base, source, limit) {
                    values.push(ev);
                }
            }
            completed = end;

            if let Some(report) = progress.as_ref() {
                report(SimulationProgress { completed, total });
            }
            tokio::task::yield_now().await;
        }

        self.summarize(values, base_ev)
    }

    /// One perturbed DCF; `None` when the run is discarded.
    fn iterate<S: NormalSource + ?Sized>(
        &self,
        base: &DcfAssumptions,
        source: &mut S,
        limit: f64,
    ) -> Option<f64> {
        let wacc = source.sample(base.wacc, self.config.wacc_std_dev);
        if !wacc.is_finite() {
            return None;
        }
        let wacc = wacc.clamp(WACC_BOUNDS.0, WACC_BOUNDS.1);
        let growth_rates = base
            .growth_rates
            .iter()
            .map(|g| {
                source
                    .sample(*g, self.config.growth_std_dev)
                    .clamp(GROWTH_BOUNDS.0, GROWTH_BOUNDS.1)
            })
            .collect();
        let terminal_growth_rate = source
            .sample(base.terminal_growth_rate, self.config.terminal_growth_std_dev)
            .clamp(MIN_TERMINAL_GROWTH, wacc - TERMINAL_GROWTH_WACC_GAP);

        let case = DcfAssumptions {
            wacc,
            growth_rates,
            terminal_growth_rate,
            ..base.clone()
        };

        calculate_dcf(&case)
            .ok()
            .map(|r| r.enterprise_value)
            .filter(|ev| ev.is_finite() && *ev < limit)
    }

    fn summarize(&self, mut values: Vec<f64>, base_ev: f64) -> EngineResult<SimulationResult> {
        let iterations = self.config.iterations;
        if values.is_empty() {
            return Err(EngineError::NoValidSimulations {
                attempted: iterations,
            });
        }

        values.sort_by(|a, b| a.total_cmp(b));
        let mean = values.iter().mean();
        let std_dev = if values.len() > 1 {
            values.iter().std_dev()
        } else {
            0.0
        };
        let min = values[0];
        let max = values[values.len() - 1];

        let result = SimulationResult {
            iterations,
            valid_iterations: values.len(),
            discarded: iterations - values.len(),
            base_enterprise_value: base_ev,
            mean,
            median: percentile(&values, 0.50),
            std_dev,
            p5: percentile(&values, 0.05),
            p25: percentile(&values, 0.25),
            p75: percentile(&values, 0.75),
            p95: percentile(&values, 0.95),
            min,
            max,
            histogram: histogram(&values, self.config.histogram_bins),
        };

        tracing::debug!(
            valid = result.valid_iterations,
            discarded = result.discarded,
            mean = result.mean,
            p5 = result.p5,
            p95 = result.p95,
            "Monte Carlo simulation complete"
        );
        Ok(result)
    }
}

/// Linear-interpolated percentile of sorted values.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Equal-width histogram of sorted values.
pub fn histogram(sorted: &[f64], bins: usize) -> Vec<HistogramBin> {
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    let bins = bins.max(1);
    let width = (max - min) / bins as f64;

    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for value in sorted {
        let idx = if width > 0.0 {
            (((value - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        histogram[idx].count += 1;
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcf::TerminalValueMethod;
    use crate::simulation::BoxMuller;
    use std::sync::atomic::AtomicUsize;

    fn base() -> DcfAssumptions {
        DcfAssumptions {
            base_fcf: 500_000.0,
            growth_rates: vec![0.05, 0.045, 0.04, 0.035, 0.03],
            wacc: 0.14,
            terminal_growth_rate: 0.025,
            net_debt: 0.0,
            base_ebitda: Some(700_000.0),
            mid_year_convention: true,
            terminal_method: TerminalValueMethod::GordonGrowth,
        }
    }

    fn config(iterations: usize) -> MonteCarloConfig {
        MonteCarloConfig {
            iterations,
            wacc_std_dev: 0.015,
            growth_std_dev: 0.03,
            terminal_growth_std_dev: 0.005,
            chunk_size: 500,
            histogram_bins: 20,
            seed: None,
        }
    }

    #[test]
    fn test_convergence_to_base_case() {
        let simulator = MonteCarloSimulator::new(config(5_000));
        let mut source = BoxMuller::seeded(2024);
        let result = simulator.run(&base(), &mut source).unwrap();

        assert_eq!(result.iterations, 5_000);
        assert_eq!(result.valid_iterations + result.discarded, 5_000);
        let deviation = (result.mean - result.base_enterprise_value).abs() / result.base_enterprise_value;
        assert!(deviation < 0.10, "mean deviates {:.3} from base case", deviation);
    }

    #[test]
    fn test_statistics_ordered() {
        let simulator = MonteCarloSimulator::new(config(2_000));
        let result = simulator.run(&base(), &mut BoxMuller::seeded(1)).unwrap();
        assert!(result.min <= result.p5);
        assert!(result.p5 <= result.p25);
        assert!(result.p25 <= result.median);
        assert!(result.median <= result.p75);
        assert!(result.p75 <= result.p95);
        assert!(result.p95 <= result.max);
        assert!(result.std_dev > 0.0);
        assert_eq!(result.histogram.len(), 20);
        let counted: usize = result.histogram.iter().map(|b| b.count).sum();
        assert_eq!(counted, result.valid_iterations);
    }

    #[test]
    fn test_same_seed_same_result() {
        let simulator = MonteCarloSimulator::new(config(1_000));
        let a = simulator.run(&base(), &mut BoxMuller::seeded(5)).unwrap();
        let b = simulator.run(&base(), &mut BoxMuller::seeded(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_base_case_guard_propagates() {
        let mut b = base();
        b.wacc = 0.02;
        let err = MonteCarloSimulator::new(config(10))
            .run(&b, &mut BoxMuller::seeded(3))
            .unwrap_err();
        assert_eq!(err.reason_code(), "wacc_below_terminal_growth");
    }

    #[tokio::test]
    async fn test_chunked_reports_progress() {
        let simulator = MonteCarloSimulator::new(config(1_200));
        let calls = AtomicUsize::new(0);
        let mut source = BoxMuller::seeded(9);
        let result = simulator
            .run_chunked(
                &base(),
                &mut source,
                None,
                Some(|p: SimulationProgress| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    assert!(p.completed <= p.total);
                }),
            )
            .await
            .unwrap();
        // 500 + 500 + 200
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.iterations, 1_200);
    }

    #[tokio::test]
    async fn test_chunked_matches_sync_for_same_seed() {
        let simulator = MonteCarloSimulator::new(config(1_000));
        let sync = simulator.run(&base(), &mut BoxMuller::seeded(77)).unwrap();
        let chunked = simulator
            .run_chunked(
                &base(),
                &mut BoxMuller::seeded(77),
                None,
                None::<fn(SimulationProgress)>,
            )
            .await
            .unwrap();
        assert_eq!(sync, chunked);
    }

    #[tokio::test]
    async fn test_cancellation_between_chunks() {
        let simulator = MonteCarloSimulator::new(config(2_000));
        let flag = CancellationFlag::new();
        let trigger = flag.clone();
        let err = simulator
            .run_chunked(
                &base(),
                &mut BoxMuller::seeded(4),
                Some(&flag),
                Some(move |p: SimulationProgress| {
                    if p.completed >= 500 {
                        trigger.cancel();
                    }
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::SimulationCancelled { completed: 500 });
    }

    /// Replays a fixed sequence of standard normals, cycling.
    struct Scripted {
        values: Vec<f64>,
        next: usize,
    }

    impl NormalSource for Scripted {
        fn next_standard(&mut self) -> f64 {
            let z = self.values[self.next % self.values.len()];
            self.next += 1;
            z
        }
    }

    /// Twelve years of 30% growth; only WACC is perturbed.
    fn explosive_base(wacc: f64) -> DcfAssumptions {
        DcfAssumptions {
            base_fcf: 100_000.0,
            growth_rates: vec![0.30; 12],
            wacc,
            terminal_growth_rate: 0.04,
            net_debt: 0.0,
            base_ebitda: None,
            mid_year_convention: false,
            terminal_method: TerminalValueMethod::GordonGrowth,
        }
    }

    fn wacc_only(iterations: usize) -> MonteCarloConfig {
        MonteCarloConfig {
            wacc_std_dev: 0.02,
            growth_std_dev: 0.0,
            terminal_growth_std_dev: 0.0,
            ..config(iterations)
        }
    }

    #[test]
    fn test_implausible_runs_discarded() {
        // 1 WACC + 12 growth + 1 terminal draws per run; odd runs sample WACC at 5%
        let mut values = vec![-1.0; 14];
        values.extend(vec![0.0; 14]);
        let mut source = Scripted { values, next: 0 };

        let base = explosive_base(0.07);
        let result = MonteCarloSimulator::new(wacc_only(10))
            .run(&base, &mut source)
            .unwrap();

        assert_eq!(result.discarded, 5);
        assert_eq!(result.valid_iterations, 5);
        assert!(result.max < base.base_fcf * IMPLAUSIBLE_EV_MULTIPLE);
    }

    #[test]
    fn test_all_runs_discarded() {
        let mut source = Scripted {
            values: vec![0.0],
            next: 0,
        };
        let err = MonteCarloSimulator::new(wacc_only(10))
            .run(&explosive_base(0.05), &mut source)
            .unwrap_err();
        assert_eq!(err, EngineError::NoValidSimulations { attempted: 10 });
        assert_eq!(err.reason_code(), "no_valid_simulations");
    }

    #[test]
    fn test_non_finite_wacc_sample_discarded() {
        let mut source = Scripted {
            values: vec![f64::NAN],
            next: 0,
        };
        let err = MonteCarloSimulator::new(config(5))
            .run(&base(), &mut source)
            .unwrap_err();
        assert_eq!(err, EngineError::NoValidSimulations { attempted: 5 });
    }

    #[test]
    fn test_percentile_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.5), 3.0);
        assert_eq!(percentile(&values, 0.25), 2.0);
        assert!((percentile(&values, 0.1) - 1.4).abs() < 1e-12);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_histogram_degenerate() {
        let bins = histogram(&[3.0, 3.0, 3.0], 20);
        assert_eq!(bins.len(), 20);
        assert_eq!(bins[0].count, 3);
        assert!(histogram(&[], 20).is_empty());
    }
}
