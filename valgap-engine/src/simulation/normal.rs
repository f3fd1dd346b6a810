//! Standard normal sources for the simulator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of standard normal variates.
pub trait NormalSource: Send {
    /// Next draw from N(0, 1).
    fn next_standard(&mut self) -> f64;

    /// Next draw from N(mean, std_dev).
    fn sample(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.next_standard()
    }
}

/// Box–Muller transform over any uniform generator.
///
/// Each transform yields two independent normals; the second is cached for the
/// next call.
#[derive(Debug)]
pub struct BoxMuller<R: Rng> {
    rng: R,
    cached: Option<f64>,
}

impl<R: Rng> BoxMuller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, cached: None }
    }
}

impl BoxMuller<StdRng> {
    /// Reproducible source for a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng + Send> NormalSource for BoxMuller<R> {
    fn next_standard(&mut self) -> f64 {
        if let Some(z) = self.cached.take() {
            return z;
        }
        // u1 in (0, 1] keeps ln finite
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        self.cached = Some(radius * theta.sin());
        radius * theta.cos()
    }
}
