//! Ledger configuration

use crate::core::balance::{Tolerance, DEFAULT_TOLERANCE};
use crate::core::currency::CurrencyCode;
use crate::presentation::currency::DEFAULT_DISPLAY_DECIMAL_PLACES;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Largest scale a `Decimal` can carry.
const MAX_DECIMAL_PLACES: u32 = 28;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Balances within ±tolerance count as settled (default: 0.01)
    pub tolerance: Decimal,

    /// Decimal places for converted display amounts (default: 2)
    pub display_decimal_places: u32,

    /// Currency the group's ledger is kept in (default: USD)
    pub ledger_currency: CurrencyCode,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            display_decimal_places: DEFAULT_DISPLAY_DECIMAL_PLACES,
            ledger_currency: CurrencyCode::new("USD"),
        }
    }
}

impl LedgerConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tolerance < Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "tolerance must not be negative, got {}",
                self.tolerance
            )));
        }
        if self.display_decimal_places > MAX_DECIMAL_PLACES {
            return Err(ConfigError::Invalid(format!(
                "display_decimal_places must be at most {}, got {}",
                MAX_DECIMAL_PLACES, self.display_decimal_places
            )));
        }
        if self.ledger_currency.as_str().is_empty() {
            return Err(ConfigError::Invalid(
                "ledger_currency must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.tolerance, dec!(0.01));
        assert_eq!(config.display_decimal_places, 2);
        assert_eq!(config.ledger_currency.as_str(), "USD");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LedgerConfig::from_json_str(r#"{ "ledger_currency": "EUR" }"#).unwrap();
        assert_eq!(config.ledger_currency.as_str(), "EUR");
        assert_eq!(config.tolerance(), Tolerance::default());
    }

    #[test]
    fn test_tolerance_accepts_string_form() {
        let config = LedgerConfig::from_json_str(r#"{ "tolerance": "0.005" }"#).unwrap();
        assert_eq!(config.tolerance, dec!(0.005));
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let err = LedgerConfig::from_json_str(r#"{ "tolerance": "-1" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_excessive_precision() {
        let err = LedgerConfig::from_json_str(r#"{ "display_decimal_places": 40 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = LedgerConfig::from_json_str("{ tolerance").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
