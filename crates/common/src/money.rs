use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Number of fractional digits every amount carries.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Invalid amount format.")]
    Format(String),
    #[error("Amount cannot have more than 2 decimal places.")]
    Precision(String),
}

/// A currency amount held as a decimal with exactly two fractional digits.
///
/// Inputs with more than two fractional digits are rejected rather than
/// rounded, so every value that makes it into a `Money` is exact. Sums and
/// differences of two-digit values stay two-digit, which is why the arithmetic
/// operators never round either.
///
/// The type itself is signed because report values (net savings, worst month)
/// can go below zero; the entity validators decide which fields must stay
/// non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wraps a decimal, rejecting anything finer than a cent.
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value.scale() > MONEY_SCALE {
            return Err(MoneyError::Precision(value.to_string()));
        }
        Ok(Self::scaled(value))
    }

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, MONEY_SCALE))
    }

    fn scaled(mut value: Decimal) -> Self {
        value.rescale(MONEY_SCALE);
        Money(value)
    }

    /// Saturates at the `i64` bounds. Validated amounts stay far below them.
    pub fn cents(&self) -> i64 {
        let mut value = self.0;
        value.rescale(MONEY_SCALE);
        let mantissa = value.mantissa();
        i64::try_from(mantissa).unwrap_or(if mantissa < 0 { i64::MIN } else { i64::MAX })
    }

    pub fn as_decimal(&self) -> Decimal {
        let mut value = self.0;
        value.rescale(MONEY_SCALE);
        value
    }

    /// Lossy conversion for chart series and percentages.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Raises negative amounts to zero.
    pub fn clamp_non_negative(self) -> Self {
        self.max(Money::ZERO)
    }

    /// `self / other * 100`, or `None` when `other` is not positive.
    pub fn percent_of(&self, other: Money) -> Option<f64> {
        if !other.is_positive() {
            return None;
        }
        let ratio = self.0.checked_div(other.0)? * Decimal::ONE_HUNDRED;
        ratio.to_f64()
    }

    /// Renders as `$#,##0.00`, with a leading minus for negative values.
    pub fn format_currency(&self) -> String {
        let cents = self.cents();
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        let whole = (abs / 100).to_string();
        let frac = abs % 100;

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        format!("{sign}${grouped}.{frac:02}")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_currency())
    }
}

/// Accepts plain decimals (`1234.5`) as well as the rendered currency form
/// (`$1,234.50`, `-$3.00`). Thousands separators must sit between groups of
/// three digits.
impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format_err = || MoneyError::Format(s.to_string());

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);
        let (whole, fraction) = match rest.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (rest, None),
        };

        let whole = ungroup(whole).ok_or_else(format_err)?;
        match fraction {
            Some(f) if f.is_empty() || !is_digits(f) => return Err(format_err()),
            None if whole.is_empty() => return Err(format_err()),
            _ => {}
        }

        let mut plain = String::with_capacity(rest.len() + 2);
        if negative {
            plain.push('-');
        }
        plain.push_str(if whole.is_empty() { "0" } else { whole.as_str() });
        if let Some(f) = fraction {
            plain.push('.');
            plain.push_str(f);
        }

        let value = Decimal::from_str(&plain).map_err(|_| format_err())?;
        Money::new(value).map_err(|_| MoneyError::Precision(s.to_string()))
    }
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// Drops `1,234,567` style separators. `None` when the grouping is malformed.
fn ungroup(whole: &str) -> Option<String> {
    let mut groups = whole.split(',');
    let head = groups.next()?;
    if !is_digits(head) {
        return None;
    }

    let mut digits = head.to_string();
    let mut grouped = false;
    for group in groups {
        if group.len() != 3 || !is_digits(group) {
            return None;
        }
        digits.push_str(group);
        grouped = true;
    }

    if grouped && !(1..=3).contains(&head.len()) {
        return None;
    }
    Some(digits)
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::scaled(self.0 + rhs.0)
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
        Money::scaled(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an amount with at most two decimal places")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money::scaled(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Ok(Money::scaled(Decimal::from(v)))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_plain_and_currency_forms() {
        assert_eq!("12.5".parse::<Money>().unwrap().cents(), 1250);
        assert_eq!("$1,234.56".parse::<Money>().unwrap().cents(), 123456);
        assert_eq!(" 7 ".parse::<Money>().unwrap().cents(), 700);
        assert_eq!("-$3.00".parse::<Money>().unwrap().cents(), -300);
    }

    #[test]
    fn test_parse_rejects_extra_precision() {
        assert!(matches!("0.001".parse::<Money>(), Err(MoneyError::Precision(_))));
        assert!(matches!("10.000".parse::<Money>(), Err(MoneyError::Precision(_))));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!("abc".parse::<Money>(), Err(MoneyError::Format(_))));
        assert!(matches!("".parse::<Money>(), Err(MoneyError::Format(_))));
        assert!(matches!("$".parse::<Money>(), Err(MoneyError::Format(_))));
        assert!(matches!("-".parse::<Money>(), Err(MoneyError::Format(_))));
        assert!(matches!("12.".parse::<Money>(), Err(MoneyError::Format(_))));
    }

    #[test]
    fn test_parse_rejects_malformed_grouping() {
        for input in ["12,34", "1,2,3", "5$", "1,,000.5", ",100", "1000,000", "1,000,", "1,000.5,0", "--5", "$-5"] {
            assert!(
                matches!(input.parse::<Money>(), Err(MoneyError::Format(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_accepts_well_formed_grouping() {
        assert_eq!("1,000".parse::<Money>().unwrap().cents(), 100000);
        assert_eq!("$12,345,678.90".parse::<Money>().unwrap().cents(), 1234567890);
        assert_eq!("-$1,000.5".parse::<Money>().unwrap().cents(), -100050);
        assert_eq!("1000000".parse::<Money>().unwrap().cents(), 100000000);
        assert_eq!(".5".parse::<Money>().unwrap().cents(), 50);
    }

    #[test]
    fn test_cents_saturates_beyond_i64() {
        let huge = Money::new(Decimal::from_i128_with_scale(i64::MAX as i128 * 10, 2)).unwrap();
        assert_eq!(huge.cents(), i64::MAX);
        let tiny = Money::new(Decimal::from_i128_with_scale(i64::MIN as i128 * 10, 2)).unwrap();
        assert_eq!(tiny.cents(), i64::MIN);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(Money::from_cents(0).to_string(), "$0.00");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(99999999).to_string(), "$999,999.99");
        assert_eq!(Money::from_cents(123456789).to_string(), "$1,234,567.89");
        assert_eq!(Money::from_cents(-100000).to_string(), "-$1,000.00");
    }

    #[test]
    fn test_format_then_parse_preserves_value() {
        for cents in [0, 1, 99, 100, 1001, 123456, 99999999, 999999999, -4250] {
            let money = Money::from_cents(cents);
            let parsed: Money = money.to_string().parse().unwrap();
            assert_eq!(parsed, money);
            assert_eq!(parsed.cents(), cents);
        }
    }

    #[test]
    fn test_arithmetic_keeps_two_digits() {
        let a = Money::new(dec!(0.1)).unwrap();
        let b = Money::new(dec!(0.2)).unwrap();
        assert_eq!((a + b).as_decimal(), dec!(0.30));
        assert_eq!((a + b).as_decimal().scale(), 2);
        assert_eq!((a - b).cents(), -10);
        assert_eq!((a - b).clamp_non_negative(), Money::ZERO);
    }

    #[test]
    fn test_percent_of_guards_non_positive_target() {
        let current = Money::from_cents(2500);
        assert_eq!(current.percent_of(Money::from_cents(10000)), Some(25.0));
        assert_eq!(current.percent_of(Money::ZERO), None);
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_cents(150), Money::from_cents(250)].iter().sum();
        assert_eq!(total.cents(), 400);
    }

    #[test]
    fn test_serde_accepts_string_and_number() {
        let from_str: Money = serde_json::from_str("\"19.99\"").unwrap();
        let from_num: Money = serde_json::from_str("19.99").unwrap();
        let from_int: Money = serde_json::from_str("20").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(from_int.cents(), 2000);
        assert!(serde_json::from_str::<Money>("19.999").is_err());
        assert_eq!(serde_json::to_string(&from_str).unwrap(), "19.99");
    }
}
