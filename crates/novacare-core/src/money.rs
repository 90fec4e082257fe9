//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely, plus the
//! currency formatter used by every page that shows an amount.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Prices have at most two decimals, so a cart subtotal in cents is     │
//! │    exact. Tax is the only derived value that needs rounding, and it is  │
//! │    rounded half-up to the cent at each step.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use novacare_core::money::{format_currency, Money};
//!
//! let price = Money::from_cents(450); // $4.50
//! let line = price * 2;               // $9.00
//! assert_eq!(format_currency(line, "USD"), "$9.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use novacare_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts, only the major unit should be negative.
    /// `from_major_minor(-5, 50)` = -$5.50
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a decimal amount as typed into a price field ("4.5", "12.99").
    ///
    /// ## Rules
    /// - Optional leading `-`
    /// - At most two fraction digits (a third digit would need rounding, which
    ///   a price field never asks for)
    ///
    /// ## Example
    /// ```rust
    /// use novacare_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("4.5").unwrap().cents(), 450);
    /// assert!(Money::parse_decimal("abc").is_err());
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let input = input.trim();
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("must be a number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("must be a number"));
        }
        if frac.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("amount too large"))?
        };
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid("must be a number"))? * 10,
            _ => frac.parse().map_err(|_| invalid("must be a number"))?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Calculates tax to add on top of a tax-exclusive amount.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 rounds half-up
    /// to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use novacare_core::money::Money;
    /// use novacare_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(1495); // $14.95
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(1000)); // 10%
    /// // $14.95 × 10% = $1.495 → $1.50
    /// assert_eq!(tax.cents(), 150);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 to prevent overflow on large amounts
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Calculates the tax already contained in a tax-inclusive amount.
    ///
    /// `tax = amount − amount / (1 + rate)`, which is `amount × bps / (10000 + bps)`,
    /// rounded half-up to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use novacare_core::money::Money;
    /// use novacare_core::types::TaxRate;
    ///
    /// let gross = Money::from_cents(1100); // $11.00 incl. 10%
    /// assert_eq!(gross.included_tax(TaxRate::from_bps(1000)).cents(), 100);
    /// ```
    pub fn included_tax(&self, rate: TaxRate) -> Money {
        let bps = rate.bps() as i128;
        let divisor = 10000 + bps;
        let tax_cents = (2 * self.0 as i128 * bps + divisor) / (2 * divisor);
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Renders the amount as a plain decimal with two places ("14.95").
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

// =============================================================================
// Currency Formatting
// =============================================================================

/// Currencies whose display symbol differs from the ISO code.
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("INR", "₹"),
    ("CAD", "CA$"),
    ("AUD", "A$"),
    ("NZD", "NZ$"),
    ("CNY", "CN¥"),
    ("KRW", "₩"),
    ("ILS", "₪"),
    ("VND", "₫"),
    ("MXN", "MX$"),
    ("BRL", "R$"),
    ("PHP", "₱"),
];

/// Currencies displayed without fraction digits.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["JPY", "KRW", "VND", "CLP", "ISK", "UGX"];

/// Formats an amount for display in the given ISO 4217 currency.
///
/// en-US conventions: known currencies use their symbol, unknown codes are
/// printed as `"{CODE}\u{a0}"` before the number, thousands are grouped with
/// commas, and at most two fraction digits are shown.
///
/// ## Example
/// ```rust
/// use novacare_core::money::{format_currency, Money};
///
/// assert_eq!(format_currency(Money::from_cents(123450), "USD"), "$1,234.50");
/// assert_eq!(format_currency(Money::from_cents(-550), "EUR"), "-€5.50");
/// assert_eq!(format_currency(Money::from_cents(123456), "JPY"), "¥1,235");
/// ```
pub fn format_currency(amount: Money, currency_code: &str) -> String {
    let code = currency_code.trim().to_ascii_uppercase();
    let code = if code.is_empty() { "USD".to_string() } else { code };

    let prefix = CURRENCY_SYMBOLS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, symbol)| symbol.to_string())
        .unwrap_or_else(|| format!("{}\u{a0}", code));

    let sign = if amount.is_negative() { "-" } else { "" };
    let cents = amount.cents().unsigned_abs();

    let body = if ZERO_DECIMAL_CURRENCIES.contains(&code.as_str()) {
        group_thousands((cents + 50) / 100)
    } else {
        format!("{}.{:02}", group_thousands(cents / 100), cents % 100)
    };

    format!("{}{}{}", sign, prefix, body)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in dollars.
///
/// ## Note
/// This is for logs. Use [`format_currency`] with the store currency for
/// anything an operator sees.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
