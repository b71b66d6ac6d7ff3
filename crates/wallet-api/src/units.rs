//! Decimal amount to smallest-unit conversion.
//!
//! Amounts arrive from the Link surface as JSON numbers with a separate
//! decimal count. Conversion goes through the shortest decimal rendering of
//! the float so that `0.1` with 18 decimals becomes exactly
//! `100000000000000000`, not the binary approximation.

use std::str::FromStr;

use alloy_primitives::U256;
use thiserror::Error;

/// Decimal digits in `U256::MAX`.
const MAX_DIGITS: usize = 78;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount overflows 256 bits: {0}")]
    Overflow(String),
}

/// Converts a float amount into base units with `decimals` fractional digits.
///
/// Extra fractional digits beyond `decimals` are truncated.
pub fn to_base_units(amount: f64, decimals: u32) -> Result<U256, UnitsError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(UnitsError::InvalidAmount(amount.to_string()));
    }
    // f64's Display never uses exponent notation.
    parse_decimal_units(&amount.to_string(), decimals)
}

/// Converts a decimal string (`"12.5"`, `"0.000001"`, `"3"`) into base units.
pub fn parse_decimal_units(amount: &str, decimals: u32) -> Result<U256, UnitsError> {
    let raw = amount.trim();
    let (whole, fraction) = match raw.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw, ""),
    };

    let valid = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !valid(whole) || !valid(fraction) {
        return Err(UnitsError::InvalidAmount(amount.to_string()));
    }

    let decimals = decimals as usize;
    let kept = &fraction[..fraction.len().min(decimals)];
    let whole_digits = whole.trim_start_matches('0').len();
    let significant = if whole_digits > 0 {
        whole_digits.saturating_add(decimals)
    } else {
        match kept.find(|c| c != '0') {
            Some(leading_zeros) => decimals - leading_zeros,
            None => return Ok(U256::ZERO),
        }
    };
    if significant > MAX_DIGITS {
        return Err(UnitsError::Overflow(amount.to_string()));
    }

    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    digits.push_str(kept);
    digits.extend(std::iter::repeat('0').take(decimals - kept.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str(digits).map_err(|_| UnitsError::Overflow(amount.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_ether() {
        let wei = to_base_units(1.0, 18).unwrap();
        assert_eq!(wei.to_string(), "1000000000000000000");
    }

    #[test]
    fn fractional_amount_is_exact() {
        assert_eq!(to_base_units(0.1, 18).unwrap().to_string(), "100000000000000000");
        assert_eq!(to_base_units(1.5, 9).unwrap().to_string(), "1500000000");
    }

    #[test]
    fn zero_decimals() {
        assert_eq!(to_base_units(42.0, 0).unwrap(), U256::from(42u64));
    }

    #[test]
    fn excess_fraction_is_truncated() {
        assert_eq!(parse_decimal_units("1.23456789", 6).unwrap(), U256::from(1_234_567u64));
    }

    #[test]
    fn zero_amount() {
        assert_eq!(to_base_units(0.0, 18).unwrap(), U256::ZERO);
    }

    #[test]
    fn negative_and_non_finite_rejected() {
        assert!(matches!(to_base_units(-1.0, 18), Err(UnitsError::InvalidAmount(_))));
        assert!(to_base_units(f64::NAN, 18).is_err());
        assert!(to_base_units(f64::INFINITY, 18).is_err());
    }

    #[test]
    fn garbage_string_rejected() {
        assert!(parse_decimal_units("1.2.3", 18).is_err());
        assert!(parse_decimal_units("abc", 18).is_err());
        assert!(parse_decimal_units("", 18).is_err());
        assert!(parse_decimal_units(".", 18).is_err());
    }

    #[test]
    fn overflow_detected() {
        let huge = "9".repeat(80);
        assert!(matches!(parse_decimal_units(&huge, 0), Err(UnitsError::Overflow(_))));
    }

    #[test]
    fn huge_decimal_places_fail_fast() {
        assert!(matches!(to_base_units(1.0, 2_000_000_000), Err(UnitsError::Overflow(_))));
        assert!(matches!(to_base_units(0.5, u32::MAX), Err(UnitsError::Overflow(_))));
        assert_eq!(to_base_units(0.0, u32::MAX).unwrap(), U256::ZERO);
    }

    #[test]
    fn largest_digit_count_still_parses() {
        let wei = parse_decimal_units("1", 76).unwrap();
        assert_eq!(wei.to_string().len(), 77);
        assert!(parse_decimal_units("1", 78).is_err());
    }
}
