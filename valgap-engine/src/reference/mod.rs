//! Reference data: industry multiples and betas.
//!
//! The values themselves are configuration, loaded from a JSON file:
//!
//! ```json
//! {
//!   "multiples": [
//!     { "level": "sector", "code": "building_services",
//!       "ebitda_low": 3.5, "ebitda_high": 6.5, "revenue_low": 0.4, "revenue_high": 1.1 }
//!   ],
//!   "betas": [
//!     { "level": "industry", "code": "industrials", "beta": 1.1 }
//!   ]
//! }
//! ```

pub mod multiples;
pub mod table;

pub use multiples::{
    resolve_multiples, MarginRange, MultipleRange, RawMultiples, ResolvedMultiples,
};
pub use table::{MatchLevel, ReferenceEntry, ReferenceTable};

use serde::{Deserialize, Serialize};
use std::path::Path;
use valgap_common::error::{Result, ResultExt};

use crate::types::Classification;

/// Industry equity beta row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndustryBeta {
    pub beta: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ReferenceDataFile {
    #[serde(default)]
    multiples: Vec<ReferenceEntry<RawMultiples>>,
    #[serde(default)]
    betas: Vec<ReferenceEntry<IndustryBeta>>,
}

/// All cross-sectional reference tables the engine consults.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub multiples: ReferenceTable<RawMultiples>,
    pub betas: ReferenceTable<IndustryBeta>,
}

impl ReferenceData {
    /// Parse reference data from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ReferenceDataFile =
            serde_json::from_str(json).context("Failed to parse reference data")?;
        Ok(Self {
            multiples: file.multiples.into_iter().collect(),
            betas: file.betas.into_iter().collect(),
        })
    }

    /// Load reference data from a JSON file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read reference data from {}", path.display()))?;
        let data = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            multiples = data.multiples.len(),
            betas = data.betas.len(),
            "Loaded reference data"
        );
        Ok(data)
    }

    /// Resolve the multiple range for a classification.
    pub fn multiples_for(&self, classification: &Classification) -> ResolvedMultiples {
        resolve_multiples(&self.multiples, classification)
    }

    /// Industry beta through the same cascade, if any tier matches.
    pub fn beta_for(&self, classification: &Classification) -> Option<f64> {
        self.betas
            .resolve(classification)
            .map(|(_, entry)| entry.beta)
            .filter(|beta| beta.is_finite() && *beta > 0.0)
    }
}
