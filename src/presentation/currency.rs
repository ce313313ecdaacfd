//! Read-only conversion of balances into a viewer's currency.
//!
//! Nothing produced here is ever fed back into the ledger: rounded display
//! amounts stay on the presentation side.

use crate::core::balance::Balance;
use crate::core::currency::{CurrencyCode, ExchangeRateSource, FxError};
use crate::core::member::MemberId;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// Decimal places used for display when none are configured.
pub const DEFAULT_DISPLAY_DECIMAL_PLACES: u32 = 2;

/// A balance expressed in a display currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentedBalance {
    pub member_id: MemberId,
    pub currency: CurrencyCode,
    /// Rate applied: 1 unit of ledger currency = `rate` display units.
    pub rate: Decimal,
    pub amount_paid: Decimal,
    pub amount_owed: Decimal,
    pub settlements_in: Decimal,
    pub settlements_out: Decimal,
    pub net_balance: Decimal,
    /// False when the display currency equals the ledger currency.
    pub converted: bool,
}

impl fmt::Display for PresentedBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<15} {:>12} {}", self.member_id, self.net_balance, self.currency)?;
        if self.converted {
            write!(f, "  (@ {})", self.rate)?;
        }
        Ok(())
    }
}

/// Converts balances for display.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyPresenter {
    decimal_places: u32,
}

impl Default for CurrencyPresenter {
    fn default() -> Self {
        Self {
            decimal_places: DEFAULT_DISPLAY_DECIMAL_PLACES,
        }
    }
}

impl CurrencyPresenter {
    pub fn new(decimal_places: u32) -> Self {
        Self { decimal_places }
    }

    /// Present `balance` in `display_currency` using an explicit rate.
    ///
    /// Same currency: amounts are returned untouched, with no rounding.
    /// Otherwise every amount is multiplied by `rate` and rounded half away
    /// from zero to the configured decimal places.
    pub fn present(
        &self,
        balance: &Balance,
        group_currency: &CurrencyCode,
        display_currency: &CurrencyCode,
        rate: Decimal,
    ) -> Result<PresentedBalance, FxError> {
        if group_currency == display_currency {
            return Ok(PresentedBalance {
                member_id: balance.member_id().clone(),
                currency: display_currency.clone(),
                rate: Decimal::ONE,
                amount_paid: balance.amount_paid(),
                amount_owed: balance.amount_owed(),
                settlements_in: balance.settlements_in(),
                settlements_out: balance.settlements_out(),
                net_balance: balance.net_balance(),
                converted: false,
            });
        }

        if rate <= Decimal::ZERO {
            return Err(FxError::InvalidRate {
                from: group_currency.clone(),
                to: display_currency.clone(),
                rate,
            });
        }

        let convert = |amount: Decimal| -> Result<Decimal, FxError> {
            amount
                .checked_mul(rate)
                .map(|v| {
                    v.round_dp_with_strategy(
                        self.decimal_places,
                        RoundingStrategy::MidpointAwayFromZero,
                    )
                })
                .ok_or_else(|| FxError::ConversionOverflow {
                    from: group_currency.clone(),
                    to: display_currency.clone(),
                    amount,
                    rate,
                })
        };

        Ok(PresentedBalance {
            member_id: balance.member_id().clone(),
            currency: display_currency.clone(),
            rate,
            amount_paid: convert(balance.amount_paid())?,
            amount_owed: convert(balance.amount_owed())?,
            settlements_in: convert(balance.settlements_in())?,
            settlements_out: convert(balance.settlements_out())?,
            net_balance: convert(balance.net_balance())?,
            converted: true,
        })
    }

    /// Like [`present`](Self::present), looking the rate up in `rates`.
    pub fn present_with<R: ExchangeRateSource + ?Sized>(
        &self,
        balance: &Balance,
        group_currency: &CurrencyCode,
        display_currency: &CurrencyCode,
        rates: &R,
    ) -> Result<PresentedBalance, FxError> {
        let rate = rates.rate(group_currency, display_currency)?;
        self.present(balance, group_currency, display_currency, rate)
    }
}

/// Present with the default display precision.
pub fn present(
    balance: &Balance,
    group_currency: &CurrencyCode,
    display_currency: &CurrencyCode,
    rate: Decimal,
) -> Result<PresentedBalance, FxError> {
    CurrencyPresenter::default().present(balance, group_currency, display_currency, rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::FxRateTable;
    use rust_decimal_macros::dec;

    fn balance() -> Balance {
        Balance::checked_new(MemberId::new("A"), dec!(100.005), dec!(33.3333), dec!(0), dec!(0))
            .unwrap()
    }

    #[test]
    fn test_same_currency_is_untouched() {
        let usd = CurrencyCode::new("USD");
        let presented = present(&balance(), &usd, &usd, dec!(7)).unwrap();
        assert!(!presented.converted);
        assert_eq!(presented.rate, Decimal::ONE);
        assert_eq!(presented.amount_owed, dec!(33.3333));
        assert_eq!(presented.net_balance, balance().net_balance());
    }

    #[test]
    fn test_conversion_rounds_for_display_only() {
        let b = balance();
        let presented = present(
            &b,
            &CurrencyCode::new("USD"),
            &CurrencyCode::new("EUR"),
            dec!(0.5),
        )
        .unwrap();
        assert!(presented.converted);
        assert_eq!(presented.amount_paid, dec!(50.00));
        assert_eq!(presented.amount_owed, dec!(16.67));
        assert_eq!(presented.net_balance, dec!(33.34));
        // The source balance is unchanged.
        assert_eq!(b.amount_owed(), dec!(33.3333));
    }

    #[test]
    fn test_negative_net_rounds_away_from_zero() {
        let b = Balance::from_net(MemberId::new("B"), dec!(-10.005));
        let presented = CurrencyPresenter::new(2)
            .present(&b, &"USD".into(), &"GBP".into(), dec!(1))
            .unwrap();
        assert_eq!(presented.net_balance, dec!(-10.01));
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        let err = present(&balance(), &"USD".into(), &"EUR".into(), dec!(0)).unwrap_err();
        assert!(matches!(err, FxError::InvalidRate { .. }));
    }

    #[test]
    fn test_conversion_overflow_is_an_error() {
        let b = Balance::from_net(MemberId::new("A"), Decimal::MAX);
        let err = present(&b, &"USD".into(), &"JPY".into(), dec!(150)).unwrap_err();
        assert!(matches!(
            err,
            FxError::ConversionOverflow { amount, .. } if amount == Decimal::MAX
        ));
    }

    #[test]
    fn test_present_with_rate_table() {
        let mut rates = FxRateTable::new();
        rates
            .set_rate(CurrencyCode::new("EUR"), CurrencyCode::new("USD"), dec!(2))
            .unwrap();
        let presenter = CurrencyPresenter::new(0);
        let b = Balance::from_net(MemberId::new("A"), dec!(10));

        let presented = presenter
            .present_with(&b, &"USD".into(), &"EUR".into(), &rates)
            .unwrap();
        assert_eq!(presented.net_balance, dec!(5));

        let missing = presenter.present_with(&b, &"USD".into(), &"JPY".into(), &rates);
        assert!(matches!(missing, Err(FxError::RateNotFound { .. })));
    }
}
