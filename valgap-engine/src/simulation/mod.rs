//! Probabilistic sensitivity of the DCF.
//!
//! The only long-running computation in the engine. Randomness comes in through
//! [`NormalSource`] so tests can use fixed seeds.

pub mod monte_carlo;
pub mod normal;

pub use monte_carlo::{
    histogram, percentile, CancellationFlag, HistogramBin, MonteCarloSimulator,
    SimulationProgress, SimulationResult,
};
pub use normal::{BoxMuller, NormalSource};
