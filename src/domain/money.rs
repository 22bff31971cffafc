use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub, SubAssign};

/// Number of fractional digits a currency amount may carry.
pub const CURRENCY_SCALE: u32 = 2;

/// A strictly positive monetary amount at currency precision.
///
/// Every money-moving operation takes an `Amount`, so zero, negative and
/// sub-cent values are rejected before any state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "amount must be positive, got {value}"
            )));
        }
        if value.normalize().scale() > CURRENCY_SCALE {
            return Err(LedgerError::validation(format!(
                "amount {value} exceeds currency precision of {CURRENCY_SCALE} decimal places"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A balance bucket on an affiliate (earned, pending or paid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Balance(Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Whether `amount` can be taken out of this balance without going negative.
    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.0
    }

    /// Adds `amount`, declining instead of overflowing the decimal range.
    pub fn checked_add(self, amount: Amount) -> Result<Self> {
        self.0.checked_add(amount.0).map(Self).ok_or_else(|| {
            LedgerError::validation(format!("adding {amount} to balance {self} overflows"))
        })
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Read-side aggregation saturates at the decimal bounds. Ledger mutations go
// through `checked_add` and `SubAssign` behind a `covers` check.
impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign<Amount> for Balance {
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 -= rhs.0;
    }
}

impl Sum for Balance {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.00)).is_ok());
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(LedgerError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(0.001)),
            Err(LedgerError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_trailing_zeros_are_currency_precise() {
        assert!(Amount::new(dec!(12.5000)).is_ok());
    }

    #[test]
    fn test_balance_arithmetic() {
        let mut balance = Balance::new(dec!(10.00))
            .checked_add(Amount::new(dec!(5.00)).unwrap())
            .unwrap();
        assert_eq!(balance, Balance::new(dec!(15.00)));
        balance -= Amount::new(dec!(2.50)).unwrap();
        assert_eq!(balance.value(), dec!(12.50));
        assert_eq!(balance - Balance::new(dec!(2.50)), Balance::new(dec!(10)));
    }

    #[test]
    fn test_checked_add_declines_overflow() {
        let full = Balance::new(Decimal::MAX);
        let result = full.checked_add(Amount::new(dec!(1)).unwrap());
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));

        let total: Balance = [full, full].into_iter().sum();
        assert_eq!(total.value(), Decimal::MAX);
    }

    #[test]
    fn test_balance_covers() {
        let balance = Balance::new(dec!(400));
        assert!(balance.covers(Amount::new(dec!(400)).unwrap()));
        assert!(!balance.covers(Amount::new(dec!(400.01)).unwrap()));
    }

    #[test]
    fn test_amount_deserialization_rejects_zero() {
        let ok: std::result::Result<Amount, _> = serde_json::from_str("\"12.34\"");
        assert_eq!(ok.unwrap().value(), dec!(12.34));

        let zero: std::result::Result<Amount, _> = serde_json::from_str("\"0\"");
        assert!(zero.is_err());
    }
}
