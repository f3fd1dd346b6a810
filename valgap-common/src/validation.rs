//! Configuration validation.
//!
//! Checks that configured rates, weights and simulation settings are within
//! ranges the engine can work with.

use thiserror::Error;

use crate::config::{CategoryWeights, Config, DcfConfig, MonteCarloConfig, ValuationConfig, WaccConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

fn check_rate(field: &str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(invalid(field, format!("must be between {} and {}", min, max)));
    }
    Ok(())
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors: Vec<ValidationError> = [
            self.valuation.validate(),
            self.wacc.validate(),
            self.dcf.validate(),
            self.monte_carlo.validate(),
            self.check_growth_below_wacc_floor(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Load configuration with environment overrides and validate it.
    pub fn load_and_validate() -> crate::error::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(|e| crate::error::Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// The simulator never samples WACC below 5%, so a terminal growth at or above
    /// it would make every Gordon-growth run invalid.
    fn check_growth_below_wacc_floor(&self) -> ValidationResult<()> {
        if self.dcf.terminal_growth_rate >= 0.05 {
            return Err(ValidationError::Conflict {
                reason: format!(
                    "dcf.terminal_growth_rate {} must stay below the 5% WACC floor",
                    self.dcf.terminal_growth_rate
                ),
            });
        }
        Ok(())
    }
}

impl Validate for ValuationConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !(0.0..1.0).contains(&self.spread_factor) {
            return Err(invalid("valuation.spread_factor", "must be in [0, 1)"));
        }
        self.category_weights.validate()
    }
}

impl Validate for CategoryWeights {
    fn validate(&self) -> ValidationResult<()> {
        let weights = self.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(invalid(
                "valuation.category_weights",
                "weights must be non-negative numbers",
            ));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(invalid(
                "valuation.category_weights",
                "at least one weight must be positive",
            ));
        }
        Ok(())
    }
}

impl Validate for WaccConfig {
    fn validate(&self) -> ValidationResult<()> {
        check_rate("wacc.risk_free_rate", self.risk_free_rate, 0.0, 0.15)?;
        check_rate("wacc.equity_risk_premium", self.equity_risk_premium, 0.0, 0.15)?;
        check_rate("wacc.default_beta", self.default_beta, 0.1, 3.0)?;
        check_rate("wacc.default_tax_rate", self.default_tax_rate, 0.0, 0.5)
    }
}

impl Validate for DcfConfig {
    fn validate(&self) -> ValidationResult<()> {
        check_rate("dcf.terminal_growth_rate", self.terminal_growth_rate, 0.0, 0.1)?;
        if self.default_growth_rates.is_empty() {
            return Err(invalid("dcf.default_growth_rates", "must not be empty"));
        }
        for rate in &self.default_growth_rates {
            check_rate("dcf.default_growth_rates", *rate, -0.2, 0.3)?;
        }
        Ok(())
    }
}

impl Validate for MonteCarloConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.chunk_size == 0 {
            return Err(invalid("monte_carlo.chunk_size", "must be greater than 0"));
        }
        if !(20..=25).contains(&self.histogram_bins) {
            return Err(invalid("monte_carlo.histogram_bins", "must be between 20 and 25"));
        }
        check_rate("monte_carlo.wacc_std_dev", self.wacc_std_dev, 0.0, 0.1)?;
        check_rate("monte_carlo.growth_std_dev", self.growth_std_dev, 0.0, 0.2)?;
        check_rate(
            "monte_carlo.terminal_growth_std_dev",
            self.terminal_growth_std_dev,
            0.0,
            0.05,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_spread() {
        let mut config = Config::default();
        config.valuation.spread_factor = 1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("valuation.spread_factor"));
    }

    #[test]
    fn test_zero_weights_rejected() {
        let weights = CategoryWeights {
            financial: 0.0,
            transferability: 0.0,
            operational: 0.0,
            market: 0.0,
            legal_tax: 0.0,
            personal: 0.0,
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_terminal_growth_conflict() {
        let mut config = Config::default();
        config.dcf.terminal_growth_rate = 0.06;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Conflict { .. })
        ));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = Config::default();
        config.monte_carlo.chunk_size = 0;
        config.wacc.default_tax_rate = 0.9;
        match config.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected multiple errors, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_iterations_disables_simulation() {
        let mut mc = MonteCarloConfig::default();
        mc.iterations = 0;
        assert!(mc.validate().is_ok());
    }

    #[test]
    fn test_histogram_bins_range() {
        let mut mc = MonteCarloConfig::default();
        mc.histogram_bins = 10;
        assert!(mc.validate().is_err());
        mc.histogram_bins = 25;
        assert!(mc.validate().is_ok());
    }
}
