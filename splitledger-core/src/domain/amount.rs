//! Fixed-point amounts and the decimal <-> base-unit codec
//!
//! The ledger stores every monetary value as an unsigned integer count of
//! base units (10^-decimals of a display unit). Net positions are signed.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};

/// Decimals used by ether-denominated ledgers
pub const ETHER_DECIMALS: u32 = 18;

/// Largest supported scale; 10^36 still fits in a u128
pub const MAX_DECIMALS: u32 = 36;

/// Non-negative amount in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_base_units(value: u128) -> Self {
        Self(value)
    }

    pub const fn base_units(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signed amount in base units, used for net positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SignedAmount(i128);

impl SignedAmount {
    pub const ZERO: SignedAmount = SignedAmount(0);

    pub const fn from_base_units(value: i128) -> Self {
        Self(value)
    }

    pub const fn base_units(self) -> i128 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `paid - owed`, saturating at the i128 bounds
    pub fn net(paid: Amount, owed: Amount) -> Self {
        SignedAmount::from(paid) - SignedAmount::from(owed)
    }
}

impl From<Amount> for SignedAmount {
    fn from(amount: Amount) -> Self {
        Self(i128::try_from(amount.0).unwrap_or(i128::MAX))
    }
}

impl Add for SignedAmount {
    type Output = SignedAmount;

    fn add(self, rhs: SignedAmount) -> SignedAmount {
        SignedAmount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for SignedAmount {
    fn add_assign(&mut self, rhs: SignedAmount) {
        *self = *self + rhs;
    }
}

impl Sub for SignedAmount {
    type Output = SignedAmount;

    fn sub(self, rhs: SignedAmount) -> SignedAmount {
        SignedAmount(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for SignedAmount {
    type Output = SignedAmount;

    fn neg(self) -> SignedAmount {
        SignedAmount(self.0.checked_neg().unwrap_or(i128::MAX))
    }
}

impl Sum for SignedAmount {
    fn sum<I: Iterator<Item = SignedAmount>>(iter: I) -> SignedAmount {
        iter.fold(SignedAmount::ZERO, Add::add)
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Base units travel as decimal strings; u128 does not survive a JSON number.

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_integer(deserializer).map(Amount)
    }
}

impl Serialize for SignedAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SignedAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_integer(deserializer).map(SignedAmount)
    }
}

/// Deserialize an integer that may arrive as a JSON number or string
pub(crate) fn deserialize_integer<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    use serde::de::Error as _;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    let text = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s,
        _ => return Err(D::Error::custom("expected number or string for integer")),
    };
    text.trim()
        .parse::<T>()
        .map_err(|e| D::Error::custom(format!("invalid integer '{}': {}", text, e)))
}

/// Converts between human-entered decimal amounts and base units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountCodec {
    decimals: u32,
    unit: u128,
}

impl Default for AmountCodec {
    fn default() -> Self {
        Self::ether()
    }
}

impl AmountCodec {
    pub fn new(decimals: u32) -> Result<Self> {
        if decimals > MAX_DECIMALS {
            return Err(Error::config(format!(
                "amount decimals must be at most {}, got {}",
                MAX_DECIMALS, decimals
            )));
        }
        Ok(Self {
            decimals,
            unit: 10u128.pow(decimals),
        })
    }

    /// Codec for 18-decimal (ether) amounts
    pub const fn ether() -> Self {
        Self {
            decimals: ETHER_DECIMALS,
            unit: 10u128.pow(ETHER_DECIMALS),
        }
    }

    /// Parse a decimal numeral such as `"10.5"` into base units
    ///
    /// Fails with `InvalidAmount` for negative values, anything that is not a
    /// plain decimal numeral, more fractional digits than the codec carries
    /// (trailing zeros excepted), or values beyond the u128 range.
    pub fn to_base_units(&self, input: &str) -> Result<Amount> {
        let text = input.trim();
        if text.is_empty() {
            return Err(Error::invalid_amount("empty amount"));
        }

        let (negative, magnitude) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = magnitude.split_once('.').unwrap_or((magnitude, ""));

        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
            return Err(Error::invalid_amount(format!(
                "'{}' is not a decimal numeral",
                text
            )));
        }

        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > self.decimals as usize {
            return Err(Error::invalid_amount(format!(
                "'{}' has more than {} decimal places",
                text, self.decimals
            )));
        }

        let out_of_range = || Error::invalid_amount(format!("'{}' is out of range", text));
        let fraction_scale = 10u128.pow(self.decimals - fraction.len() as u32);
        let base = parse_digits(whole)
            .and_then(|w| w.checked_mul(self.unit))
            .zip(parse_digits(fraction).and_then(|f| f.checked_mul(fraction_scale)))
            .and_then(|(w, f)| w.checked_add(f))
            .ok_or_else(out_of_range)?;

        if negative && base != 0 {
            return Err(Error::invalid_amount(format!("'{}' is negative", text)));
        }
        Ok(Amount(base))
    }

    /// Convert a numeric (rather than textual) amount into base units
    pub fn decimal_to_base_units(&self, value: Decimal) -> Result<Amount> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(Error::invalid_amount(format!("'{}' is negative", value)));
        }
        self.to_base_units(&value.abs().normalize().to_string())
    }

    /// Lossless decimal rendering, e.g. `10.0`, `0.25`
    pub fn to_display_units(&self, amount: Amount) -> String {
        self.render(amount.0)
    }

    /// Lossless decimal rendering of a signed amount
    pub fn signed_to_display_units(&self, amount: SignedAmount) -> String {
        let rendered = self.render(amount.0.unsigned_abs());
        if amount.is_negative() {
            format!("-{}", rendered)
        } else {
            rendered
        }
    }

    /// Render with exactly `fraction_digits` digits, rounding half away from zero
    pub fn format_fixed(&self, amount: SignedAmount, fraction_digits: u32) -> String {
        let digits = fraction_digits.min(MAX_DECIMALS);
        let magnitude = amount.0.unsigned_abs();

        let scaled = if digits >= self.decimals {
            magnitude.saturating_mul(10u128.pow(digits - self.decimals))
        } else {
            let step = 10u128.pow(self.decimals - digits);
            let quotient = magnitude / step;
            if (magnitude % step) * 2 >= step {
                quotient + 1
            } else {
                quotient
            }
        };

        let scale = 10u128.pow(digits);
        let sign = if amount.is_negative() && scaled != 0 { "-" } else { "" };
        if digits == 0 {
            format!("{}{}", sign, scaled)
        } else {
            format!(
                "{}{}.{:0width$}",
                sign,
                scaled / scale,
                scaled % scale,
                width = digits as usize
            )
        }
    }

    fn render(&self, value: u128) -> String {
        let whole = value / self.unit;
        let fraction = format!("{:0width$}", value % self.unit, width = self.decimals as usize);
        let fraction = fraction.trim_end_matches('0');
        format!("{}.{}", whole, if fraction.is_empty() { "0" } else { fraction })
    }
}

fn parse_digits(digits: &str) -> Option<u128> {
    digits.bytes().try_fold(0u128, |acc, b| {
        acc.checked_mul(10)?.checked_add(u128::from(b - b'0'))
    })
}
