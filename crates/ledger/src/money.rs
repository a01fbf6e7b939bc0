use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, ResultLedger};

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the ledger (balances,
/// allocations, payments) so that the group zero-sum invariant holds exactly.
///
/// The value is signed:
/// - positive = the group owes this member
/// - negative = this member owes the group
///
/// # Examples
///
/// ```rust
/// use ledger::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use ledger::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// One cent: the largest drift tolerated between caller-supplied totals.
    pub const TOLERANCE: Money = Money(1);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// `true` when `self` and `other` differ by at most [`Money::TOLERANCE`].
    #[must_use]
    pub fn within_tolerance(self, other: Money) -> bool {
        self.0.abs_diff(other.0) <= Self::TOLERANCE.0.unsigned_abs()
    }

    /// Exact decimal value in major units (`1234` cents -> `12.34`).
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

/// Rounds a decimal amount in major units to cents, half away from zero.
pub fn round_cents(value: Decimal) -> ResultLedger<Money> {
    to_cents(value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Rounds a decimal amount in major units down to cents (toward negative
/// infinity).
pub fn floor_cents(value: Decimal) -> ResultLedger<Money> {
    to_cents(value.round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity))
}

fn to_cents(rounded: Decimal) -> ResultLedger<Money> {
    rounded
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .map(Money)
        .ok_or_else(amount_too_large)
}

pub(crate) fn amount_too_large() -> LedgerError {
    LedgerError::InvalidAmount("amount too large".to_string())
}

/// Sums `values`, failing with `InvalidAmount` instead of overflowing.
pub fn checked_sum(values: impl IntoIterator<Item = Money>) -> ResultLedger<Money> {
    values
        .into_iter()
        .try_fold(Money::ZERO, Money::checked_add)
        .ok_or_else(amount_too_large)
}

/// Makes `parts` sum to `total` exactly by overwriting the last element with
/// `total - sum(others)`.
///
/// Callers keep `parts` in a deterministic order (participants or payers as
/// supplied) so that the same input always moves the remainder to the same
/// member.
pub fn absorb_remainder(total: Money, parts: &mut [Money]) -> ResultLedger<()> {
    if let Some((last, others)) = parts.split_last_mut() {
        let assigned = checked_sum(others.iter().copied())?;
        *last = total.checked_sub(assigned).ok_or_else(amount_too_large)?;
    }
    Ok(())
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        f.pad(&format!("{sign}{units}.{cents:02}"))
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - max 2 fractional digits (rejects `12.345`)
    /// - rejects empty/invalid strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || LedgerError::InvalidAmount("empty amount".to_string());
        let invalid = || LedgerError::InvalidAmount("invalid amount".to_string());
        let overflow = || LedgerError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim();
        if rest.is_empty() {
            return Err(empty());
        }

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let cents_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units_str.parse().map_err(|_| invalid())?;

        let cents: i64 = match cents_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => {
                        return Err(LedgerError::InvalidAmount(
                            "too many decimals".to_string(),
                        ));
                    }
                }
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(overflow)?;

        let signed = if negative {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Money(signed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn display_formats_major_units() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(1).to_string(), "0.01");
        assert_eq!(Money::new(10).to_string(), "0.10");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().cents(), 1000);
        assert_eq!("10.5".parse::<Money>().unwrap().cents(), 1050);
        assert_eq!("10,50".parse::<Money>().unwrap().cents(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().cents(), -1);
        assert_eq!("+1.00".parse::<Money>().unwrap().cents(), 100);
        assert_eq!("  2.30 ".parse::<Money>().unwrap().cents(), 230);
    }

    #[test]
    fn parse_rejects_more_than_two_decimals() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("0.001".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn round_cents_is_half_away_from_zero() {
        assert_eq!(round_cents(dec("0.005")).unwrap(), Money::new(1));
        assert_eq!(round_cents(dec("-0.005")).unwrap(), Money::new(-1));
        assert_eq!(round_cents(dec("33.334")).unwrap(), Money::new(3333));
        assert_eq!(round_cents(dec("33.335")).unwrap(), Money::new(3334));
        assert_eq!(round_cents(dec("12")).unwrap(), Money::new(1200));
    }

    #[test]
    fn floor_cents_rounds_toward_negative_infinity() {
        assert_eq!(floor_cents(dec("33.3399")).unwrap(), Money::new(3333));
        assert_eq!(floor_cents(dec("-0.001")).unwrap(), Money::new(-1));
    }

    #[test]
    fn absorb_remainder_moves_drift_to_last_part() {
        let mut parts = [Money::new(3333), Money::new(3333), Money::new(3333)];
        absorb_remainder(Money::new(10_000), &mut parts).unwrap();
        assert_eq!(parts, [Money::new(3333), Money::new(3333), Money::new(3334)]);

        let mut single = [Money::new(5)];
        absorb_remainder(Money::new(700), &mut single).unwrap();
        assert_eq!(single, [Money::new(700)]);

        let mut empty: [Money; 0] = [];
        absorb_remainder(Money::new(700), &mut empty).unwrap();
    }

    #[test]
    fn overflowing_sums_are_rejected() {
        let huge = [Money::new(i64::MAX), Money::new(1)];
        assert!(matches!(checked_sum(huge), Err(LedgerError::InvalidAmount(_))));
        assert_eq!(
            checked_sum([Money::new(i64::MAX), Money::new(-1)]).unwrap(),
            Money::new(i64::MAX - 1)
        );

        let mut parts = [Money::new(i64::MAX), Money::new(0)];
        assert!(absorb_remainder(Money::new(-2), &mut parts).is_err());

        assert!(matches!(
            round_cents(Decimal::MAX),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(!Money::new(i64::MAX).within_tolerance(Money::new(i64::MIN)));
    }

    #[test]
    fn tolerance_is_one_cent() {
        assert!(Money::new(100).within_tolerance(Money::new(101)));
        assert!(Money::new(100).within_tolerance(Money::new(99)));
        assert!(!Money::new(100).within_tolerance(Money::new(102)));
    }

    #[test]
    fn decimal_conversion_is_exact() {
        assert_eq!(Money::new(-1234).to_decimal(), dec("-12.34"));
        assert_eq!(round_cents(Money::new(987).to_decimal()).unwrap(), Money::new(987));
    }
}
