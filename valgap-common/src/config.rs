//! Configuration management for valgap.
//!
//! The engine reads a single JSON file at `~/.valgap/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (VALGAP_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `VALGAP_LOG_LEVEL` → logging.level
//! - `VALGAP_LOG_FORMAT` → logging.format
//! - `VALGAP_SPREAD_FACTOR` → valuation.spread_factor
//! - `VALGAP_REFERENCE_DATA` → valuation.reference_data_path
//! - `VALGAP_RISK_FREE_RATE` → wacc.risk_free_rate
//! - `VALGAP_EQUITY_RISK_PREMIUM` → wacc.equity_risk_premium
//! - `VALGAP_MC_ITERATIONS` → monte_carlo.iterations

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".valgap"),
        |dirs| dirs.home_dir().join(".valgap"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub valuation: ValuationConfig,

    #[serde(default)]
    pub wacc: WaccConfig,

    #[serde(default)]
    pub dcf: DcfConfig,

    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
}

impl Config {
    /// Load configuration from the default path, or defaults if the file is absent.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("VALGAP_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("VALGAP_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(spread) = lookup("VALGAP_SPREAD_FACTOR").and_then(|v| v.parse().ok()) {
            self.valuation.spread_factor = spread;
        }
        if let Some(path) = lookup("VALGAP_REFERENCE_DATA") {
            self.valuation.reference_data_path = Some(PathBuf::from(path));
        }
        if let Some(rate) = lookup("VALGAP_RISK_FREE_RATE").and_then(|v| v.parse().ok()) {
            self.wacc.risk_free_rate = rate;
        }
        if let Some(erp) = lookup("VALGAP_EQUITY_RISK_PREMIUM").and_then(|v| v.parse().ok()) {
            self.wacc.equity_risk_premium = erp;
        }
        if let Some(iterations) = lookup("VALGAP_MC_ITERATIONS").and_then(|v| v.parse().ok()) {
            self.monte_carlo.iterations = iterations;
        }
    }

    /// Save configuration to a specific path (pretty JSON).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))
    }

    /// Resolve the reference-data file, failing when none is configured.
    pub fn reference_data_path(&self) -> Result<&Path> {
        self.valuation
            .reference_data_path
            .as_deref()
            .ok_or_else(|| Error::Config("valuation.reference_data_path is not set".into()))
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Valuation Configuration
// ============================================================================

/// Settings for the multiple-based valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Fractional width of the EV range around the mid estimate
    #[serde(default = "default_spread_factor")]
    pub spread_factor: f64,

    /// Readiness category weights (normalized before use)
    #[serde(default)]
    pub category_weights: CategoryWeights,

    /// Adjustment factor ids to report but exclude from the multiplier
    /// (e.g. "growth", "revenue_quality")
    #[serde(default)]
    pub disabled_adjustments: Vec<String>,

    /// JSON file holding industry multiples and betas
    #[serde(default)]
    pub reference_data_path: Option<PathBuf>,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            spread_factor: default_spread_factor(),
            category_weights: CategoryWeights::default(),
            disabled_adjustments: Vec::new(),
            reference_data_path: None,
        }
    }
}

fn default_spread_factor() -> f64 {
    0.15
}

/// Raw weights for the six readiness categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWeights {
    #[serde(default = "default_financial_weight")]
    pub financial: f64,
    #[serde(default = "default_transferability_weight")]
    pub transferability: f64,
    #[serde(default = "default_operational_weight")]
    pub operational: f64,
    #[serde(default = "default_market_weight")]
    pub market: f64,
    #[serde(default = "default_legal_tax_weight")]
    pub legal_tax: f64,
    #[serde(default = "default_personal_weight")]
    pub personal: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            financial: default_financial_weight(),
            transferability: default_transferability_weight(),
            operational: default_operational_weight(),
            market: default_market_weight(),
            legal_tax: default_legal_tax_weight(),
            personal: default_personal_weight(),
        }
    }
}

impl CategoryWeights {
    /// All weights in a fixed order: financial, transferability, operational,
    /// market, legal/tax, personal.
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.financial,
            self.transferability,
            self.operational,
            self.market,
            self.legal_tax,
            self.personal,
        ]
    }
}

fn default_financial_weight() -> f64 {
    0.25
}
fn default_transferability_weight() -> f64 {
    0.20
}
fn default_operational_weight() -> f64 {
    0.20
}
fn default_market_weight() -> f64 {
    0.15
}
fn default_legal_tax_weight() -> f64 {
    0.10
}
fn default_personal_weight() -> f64 {
    0.10
}

// ============================================================================
// WACC Configuration
// ============================================================================

/// Market inputs for the discount rate build-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccConfig {
    /// Risk-free rate (e.g. 20-year treasury yield)
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// Equity risk premium
    #[serde(default = "default_equity_risk_premium")]
    pub equity_risk_premium: f64,

    /// Beta used when the industry has no reference beta
    #[serde(default = "default_beta")]
    pub default_beta: f64,

    /// Tax rate used when none can be derived from statements
    #[serde(default = "default_tax_rate")]
    pub default_tax_rate: f64,
}

impl Default for WaccConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            equity_risk_premium: default_equity_risk_premium(),
            default_beta: default_beta(),
            default_tax_rate: default_tax_rate(),
        }
    }
}

fn default_risk_free_rate() -> f64 {
    0.0425
}

fn default_equity_risk_premium() -> f64 {
    0.055
}

fn default_beta() -> f64 {
    1.0
}

fn default_tax_rate() -> f64 {
    0.25
}

// ============================================================================
// DCF Configuration
// ============================================================================

/// Discounted cash flow defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfConfig {
    /// Long-run growth rate used by the Gordon growth terminal value
    #[serde(default = "default_terminal_growth_rate")]
    pub terminal_growth_rate: f64,

    /// Growth path used when history is too short to derive one.
    /// Its length sets the number of projection years.
    #[serde(default = "default_growth_rates")]
    pub default_growth_rates: Vec<f64>,

    /// Discount each year's cash flow at mid-year (period = year - 0.5)
    #[serde(default = "default_true")]
    pub mid_year_convention: bool,
}

impl Default for DcfConfig {
    fn default() -> Self {
        Self {
            terminal_growth_rate: default_terminal_growth_rate(),
            default_growth_rates: default_growth_rates(),
            mid_year_convention: true,
        }
    }
}

fn default_terminal_growth_rate() -> f64 {
    0.025
}

fn default_growth_rates() -> Vec<f64> {
    vec![0.05, 0.045, 0.04, 0.035, 0.03]
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Monte Carlo Configuration
// ============================================================================

/// Sensitivity simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Simulated runs per recalculation; 0 disables the simulation
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Standard deviation of the sampled WACC
    #[serde(default = "default_wacc_std_dev")]
    pub wacc_std_dev: f64,

    /// Standard deviation of each sampled projection-year growth rate
    #[serde(default = "default_growth_std_dev")]
    pub growth_std_dev: f64,

    /// Standard deviation of the sampled terminal growth rate
    #[serde(default = "default_terminal_growth_std_dev")]
    pub terminal_growth_std_dev: f64,

    /// Iterations processed between yield points
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,

    /// Fixed seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            wacc_std_dev: default_wacc_std_dev(),
            growth_std_dev: default_growth_std_dev(),
            terminal_growth_std_dev: default_terminal_growth_std_dev(),
            chunk_size: default_chunk_size(),
            histogram_bins: default_histogram_bins(),
            seed: None,
        }
    }
}

fn default_iterations() -> usize {
    5000
}

fn default_wacc_std_dev() -> f64 {
    0.015
}

fn default_growth_std_dev() -> f64 {
    0.03
}

fn default_terminal_growth_std_dev() -> f64 {
    0.005
}

fn default_chunk_size() -> usize {
    500
}

fn default_histogram_bins() -> usize {
    20
}
