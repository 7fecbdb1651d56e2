//! Precision validation for monetary amounts
//!
//! All arithmetic is exact decimal with half-up (midpoint away from zero)
//! rounding. Amounts are first reduced to the process-wide working
//! precision of 18 significant digits, then quantized to the currency's
//! registered decimal precision.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

/// Working precision applied before any currency quantization.
pub const WORKING_SIG_DIGITS: u32 = 18;

/// Parse a free-form amount string into an exact decimal.
///
/// NaN, infinities, and anything else `rust_decimal` cannot represent is
/// rejected as `InvalidAmount`.
pub fn parse_amount(text: &str) -> LedgerResult<Decimal> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| LedgerError::InvalidAmount {
            amount: trimmed.to_string(),
        })
}

/// Normalize `amount` to the given currency precision.
///
/// Lenient mode (the transaction-creation path) clips extra fractional
/// digits silently; strict mode reports `PrecisionLoss` instead. Positive
/// amounts only: escrow has no notion of a negative transfer.
pub fn normalize(amount: Decimal, precision: u32, strict: bool) -> LedgerResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount {
            amount: amount.to_string(),
        });
    }

    let working = to_working_precision(amount)?;
    let clipped = working.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);

    if clipped != working {
        debug!(%amount, %clipped, precision, "amount exceeds currency precision, clipping");

        if strict {
            return Err(LedgerError::PrecisionLoss { amount, precision });
        }
    }

    Ok(clipped)
}

/// Reduce an amount to `WORKING_SIG_DIGITS` significant digits, half-up.
///
/// Fails with `InvalidAmount` when the integral part alone already exceeds
/// the working precision: such a value cannot be represented without losing
/// whole units.
fn to_working_precision(amount: Decimal) -> LedgerResult<Decimal> {
    let digits = significant_digits(amount);

    if digits <= WORKING_SIG_DIGITS {
        return Ok(amount);
    }

    let excess = digits - WORKING_SIG_DIGITS;

    if amount.scale() < excess {
        return Err(LedgerError::InvalidAmount {
            amount: amount.to_string(),
        });
    }

    Ok(amount.round_dp_with_strategy(
        amount.scale() - excess,
        RoundingStrategy::MidpointAwayFromZero,
    ))
}

fn significant_digits(amount: Decimal) -> u32 {
    let mantissa = amount.mantissa().unsigned_abs();

    if mantissa == 0 {
        return 1;
    }

    let mut digits = 0u32;
    let mut rest = mantissa;

    while rest > 0 {
        rest /= 10;
        digits += 1;
    }

    digits
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exact_amount_passes_unchanged() {
        assert_eq!(normalize(dec!(10.00), 8, true).unwrap(), dec!(10.00));
        assert_eq!(normalize(dec!(0.12345678), 8, true).unwrap(), dec!(0.12345678));
    }

    #[test]
    fn test_lenient_clips_half_up() {
        // 0.123456789 at precision 8 rounds half-up
        assert_eq!(normalize(dec!(0.123456789), 8, false).unwrap(), dec!(0.12345679));
        assert_eq!(normalize(dec!(0.123456784), 8, false).unwrap(), dec!(0.12345678));
    }

    #[test]
    fn test_strict_rejects_extra_digits() {
        let err = normalize(dec!(0.123456789), 8, true).unwrap_err();
        assert!(matches!(err, LedgerError::PrecisionLoss { precision: 8, .. }));
    }

    #[test]
    fn test_idempotent() {
        let once = normalize(dec!(0.123456789), 8, false).unwrap();
        let twice = normalize(once, 8, false).unwrap();
        assert_eq!(once, twice);

        // and a second lenient pass never reports loss in strict mode
        assert_eq!(normalize(once, 8, true).unwrap(), once);
    }

    #[test]
    fn test_non_positive_rejected() {
        assert!(matches!(
            normalize(Decimal::ZERO, 8, false),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            normalize(dec!(-1.5), 8, false),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_working_precision_caps_significant_digits() {
        // 19 significant digits, last one fractional: clipped to 18
        let long = dec!(1234567890123456.789);
        let normalized = normalize(long, 8, false).unwrap();
        assert_eq!(normalized, dec!(1234567890123456.79));

        // 19 integral digits cannot be represented at working precision
        let huge = dec!(1234567890123456789);
        assert!(matches!(
            normalize(huge, 8, false),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("10.5").unwrap(), dec!(10.5));
        assert_eq!(parse_amount(" 1e2 ").unwrap(), dec!(100));
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("inf").is_err());
        assert!(parse_amount("ten").is_err());
    }
}
