// 💰 Money - Fixed-point currency in minor units (cents)
//
// Every amount that enters the engine is converted ONCE into an i64 count
// of cents. Comparisons, sums and differences are integer operations only.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

/// Minor units per major unit (cents per dollar)
pub const MINOR_UNITS: i64 = 100;

// ============================================================================
// MONEY
// ============================================================================

/// Signed amount in minor units.
///
/// The operators (`+`, `-`, unary `-`, `Sum`) saturate at the i64 bounds.
/// Use `checked_add` / `checked_sub` where overflow must be noticed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    pub const MAX: Money = Money(i64::MAX);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Convert a decimal amount to minor units.
    ///
    /// Rounds to the nearest cent, midpoint away from zero, so that
    /// `100.505` and `-100.505` land on `10051` and `-10051`.
    /// Values beyond the i64 range saturate.
    pub fn from_decimal(value: Decimal) -> Self {
        let saturated = if value.is_sign_negative() { i64::MIN } else { i64::MAX };

        let minor = value
            .checked_mul(Decimal::from(MINOR_UNITS))
            .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|cents| i64::try_from(cents).ok())
            .unwrap_or(saturated);

        Money(minor)
    }

    /// Parse a decimal string ("100.50", "-50.25", "1e2") without going
    /// through binary floating point.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .ok()
            .map(Money::from_decimal)
    }

    /// Exact inverse of `from_decimal` (always two decimal places)
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn abs(self) -> Self {
        if self.0 >= 0 {
            self
        } else {
            -self
        }
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(self.0.saturating_neg())
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::from_decimal(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_from_decimal_basic_amounts() {
        assert_eq!(Money::from_decimal(dec("100.50")).minor(), 10050);
        assert_eq!(Money::from_decimal(dec("-50.25")).minor(), -5025);
        assert_eq!(Money::from_decimal(dec("0")).minor(), 0);
        assert_eq!(Money::from_decimal(dec("0.01")).minor(), 1);
    }

    #[test]
    fn test_from_decimal_rounds_half_away_from_zero() {
        assert_eq!(Money::from_decimal(dec("100.505")).minor(), 10051);
        assert_eq!(Money::from_decimal(dec("-100.505")).minor(), -10051);
        assert_eq!(Money::from_decimal(dec("0.004")).minor(), 0);
        // 0.29 is the classic float trap (0.29 * 100 = 28.999...)
        assert_eq!(Money::from_decimal(dec("0.29")).minor(), 29);
    }

    #[test]
    fn test_to_decimal_inverse() {
        assert_eq!(Money::from_minor(10050).to_decimal(), dec("100.50"));
        assert_eq!(Money::from_minor(-5025).to_decimal(), dec("-50.25"));
        assert_eq!(Money::ZERO.to_decimal(), Decimal::ZERO);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("100.50"), Some(Money::from_minor(10050)));
        assert_eq!(Money::parse(" -50.25 "), Some(Money::from_minor(-5025)));
        assert_eq!(Money::parse("1e2"), Some(Money::from_minor(10000)));
        assert_eq!(Money::parse("abc"), None);
        assert_eq!(Money::parse(""), None);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(10000);
        let b = Money::from_minor(9500);

        assert_eq!(a - b, Money::from_minor(500));
        assert_eq!((b - a).abs(), Money::from_minor(500));
        assert_eq!(-a, Money::from_minor(-10000));
        assert_eq!(a + b, Money::from_minor(19500));

        let total: Money = vec![a, b, -b].into_iter().sum();
        assert_eq!(total, a);

        let mut running = Money::ZERO;
        running += a;
        running += a;
        assert_eq!(running.minor(), 20000);
    }

    #[test]
    fn test_checked_ops_report_overflow() {
        assert_eq!(Money::MAX.checked_add(Money::from_minor(1)), None);
        assert_eq!(Money::from_minor(i64::MIN).checked_sub(Money::from_minor(1)), None);
        assert_eq!(Money::from_minor(5).checked_sub(Money::from_minor(7)), Some(Money::from_minor(-2)));

        // Operators clamp instead
        assert_eq!(Money::MAX + Money::from_minor(1), Money::MAX);
        assert_eq!(-Money::from_minor(i64::MIN), Money::MAX);
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(Money::from_minor(-5025).to_string(), "-50.25");
        assert_eq!(Money::from_minor(7).to_string(), "0.07");
        assert_eq!(serde_json::to_string(&Money::from_minor(500)).unwrap(), "500");
    }
}
