use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// ISO 4217-style currency code.
///
/// A group keeps its ledger in one currency; viewers may ask for balances
/// in another one for display.
///
/// # Examples
///
/// ```
/// use split_ledger::core::currency::CurrencyCode;
///
/// let eur = CurrencyCode::new("EUR");
/// let usd = CurrencyCode::new("USD");
/// assert_ne!(eur, usd);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Errors arising from FX rate operations.
#[derive(Debug, Error, PartialEq)]
pub enum FxError {
    #[error("no FX rate available for {from} -> {to}")]
    RateNotFound {
        from: CurrencyCode,
        to: CurrencyCode,
    },
    #[error("FX rate must be positive, got {rate} for {from} -> {to}")]
    InvalidRate {
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
    },
    #[error("converting {amount} {from} -> {to} at {rate} overflows")]
    ConversionOverflow {
        from: CurrencyCode,
        to: CurrencyCode,
        amount: Decimal,
        rate: Decimal,
    },
}

/// Anything that can quote an exchange rate: 1 unit of `from` = `rate` units of `to`.
///
/// The hosted rate service lives behind this trait; [`FxRateTable`] is the
/// in-process implementation used by the CLI and tests.
pub trait ExchangeRateSource {
    fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal, FxError>;
}

/// FX rate table for converting between currencies.
///
/// Stores direct rates and derives the inverse on insert.
///
/// # Examples
///
/// ```
/// use split_ledger::core::currency::{CurrencyCode, ExchangeRateSource, FxRateTable};
/// use rust_decimal_macros::dec;
///
/// let mut rates = FxRateTable::new();
/// rates.set_rate(CurrencyCode::new("EUR"), CurrencyCode::new("USD"), dec!(1.10)).unwrap();
///
/// let rate = rates.rate(&CurrencyCode::new("EUR"), &CurrencyCode::new("USD")).unwrap();
/// assert_eq!(rate, dec!(1.10));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FxRateTable {
    /// Direct rates: (from, to) -> rate.
    rates: HashMap<(CurrencyCode, CurrencyCode), Decimal>,
}

impl FxRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a direct exchange rate: 1 unit of `from` = `rate` units of `to`.
    pub fn set_rate(
        &mut self,
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
    ) -> Result<(), FxError> {
        if rate <= Decimal::ZERO {
            return Err(FxError::InvalidRate { from, to, rate });
        }
        self.rates.insert((from.clone(), to.clone()), rate);
        self.rates.insert((to, from), Decimal::ONE / rate);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl ExchangeRateSource for FxRateTable {
    fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal, FxError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .ok_or_else(|| FxError::RateNotFound {
                from: from.clone(),
                to: to.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_code_equality() {
        assert_eq!(CurrencyCode::new("USD"), CurrencyCode::from("USD"));
    }

    #[test]
    fn test_fx_rate_table_direct_and_inverse() {
        let mut table = FxRateTable::new();
        table
            .set_rate(CurrencyCode::new("USD"), CurrencyCode::new("GBP"), dec!(0.80))
            .unwrap();

        let direct = table
            .rate(&CurrencyCode::new("USD"), &CurrencyCode::new("GBP"))
            .unwrap();
        assert_eq!(direct, dec!(0.80));

        let inverse = table
            .rate(&CurrencyCode::new("GBP"), &CurrencyCode::new("USD"))
            .unwrap();
        assert_eq!(inverse, dec!(1.25));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_same_currency_rate_is_one() {
        let table = FxRateTable::new();
        let rate = table
            .rate(&CurrencyCode::new("JPY"), &CurrencyCode::new("JPY"))
            .unwrap();
        assert_eq!(rate, Decimal::ONE);
    }

    #[test]
    fn test_missing_rate() {
        let table = FxRateTable::new();
        let err = table
            .rate(&CurrencyCode::new("USD"), &CurrencyCode::new("INR"))
            .unwrap_err();
        assert!(matches!(err, FxError::RateNotFound { .. }));
    }

    #[test]
    fn test_invalid_rate() {
        let mut table = FxRateTable::new();
        let result = table.set_rate(CurrencyCode::new("USD"), CurrencyCode::new("EUR"), dec!(0));
        assert!(result.is_err());
        assert!(table.is_empty());
    }
}
