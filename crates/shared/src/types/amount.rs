//! Monetary amount validation rules.
//!
//! Amounts are `rust_decimal::Decimal` everywhere; these helpers enforce the
//! platform-wide input rules before an amount ever reaches the ledger:
//! positive, at most two decimal places, and within the per-operation caps.

use rust_decimal::Decimal;
use thiserror::Error;

/// Maximum amount accepted for any single operation.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Minimum wallet top-up.
pub const MIN_TOPUP: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
/// Maximum wallet top-up per transaction.
pub const MAX_TOPUP: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Minimum loan principal.
pub const MIN_LOAN: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
/// Maximum loan principal.
pub const MAX_LOAN: Decimal = Decimal::from_parts(5_000, 0, 0, false, 0);

/// Rejection reasons for a monetary amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Amount must be strictly positive.
    #[error("Amount must be positive")]
    NotPositive,

    /// Amounts carry at most two decimal places.
    #[error("Amount has more than two decimal places")]
    TooPrecise,

    /// Amount exceeds the platform-wide maximum.
    #[error("Amount exceeds maximum ({max})")]
    ExceedsMaximum {
        /// The cap that was exceeded.
        max: Decimal,
    },

    /// Amount is below the minimum for this operation.
    #[error("Amount is below minimum ({min})")]
    BelowMinimum {
        /// The floor that was not met.
        min: Decimal,
    },
}

/// Validates a general-purpose operation amount.
///
/// # Errors
///
/// Returns `AmountError` if the amount is non-positive, carries more than two
/// decimal places, or exceeds [`MAX_AMOUNT`].
pub fn validate_amount(amount: Decimal) -> Result<(), AmountError> {
    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive);
    }
    if amount.normalize().scale() > 2 {
        return Err(AmountError::TooPrecise);
    }
    if amount > MAX_AMOUNT {
        return Err(AmountError::ExceedsMaximum { max: MAX_AMOUNT });
    }
    Ok(())
}

/// Validates a wallet top-up amount (5 to 10,000 inclusive).
///
/// # Errors
///
/// Returns `AmountError` on a malformed amount or one outside the top-up band.
pub fn validate_topup_amount(amount: Decimal) -> Result<(), AmountError> {
    validate_amount(amount)?;
    if amount < MIN_TOPUP {
        return Err(AmountError::BelowMinimum { min: MIN_TOPUP });
    }
    if amount > MAX_TOPUP {
        return Err(AmountError::ExceedsMaximum { max: MAX_TOPUP });
    }
    Ok(())
}

/// Validates a loan principal amount (10 to 5,000 inclusive).
///
/// # Errors
///
/// Returns `AmountError` on a malformed amount or one outside the loan band.
pub fn validate_loan_amount(amount: Decimal) -> Result<(), AmountError> {
    validate_amount(amount)?;
    if amount < MIN_LOAN {
        return Err(AmountError::BelowMinimum { min: MIN_LOAN });
    }
    if amount > MAX_LOAN {
        return Err(AmountError::ExceedsMaximum { max: MAX_LOAN });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0.01))]
    #[case(dec!(10))]
    #[case(dec!(999999.99))]
    #[case(dec!(1000000))]
    fn test_valid_amounts(#[case] amount: Decimal) {
        assert_eq!(validate_amount(amount), Ok(()));
    }

    #[rstest]
    #[case(dec!(0), AmountError::NotPositive)]
    #[case(dec!(-5), AmountError::NotPositive)]
    #[case(dec!(1.001), AmountError::TooPrecise)]
    #[case(dec!(1000000.01), AmountError::ExceedsMaximum { max: MAX_AMOUNT })]
    fn test_invalid_amounts(#[case] amount: Decimal, #[case] expected: AmountError) {
        assert_eq!(validate_amount(amount), Err(expected));
    }

    #[test]
    fn test_trailing_zeros_do_not_trip_scale_check() {
        // 10.2000 normalizes to 10.2 and is a valid two-decimal amount.
        assert_eq!(validate_amount(dec!(10.2000)), Ok(()));
    }

    #[rstest]
    #[case(dec!(5))]
    #[case(dec!(10000))]
    fn test_topup_bounds_inclusive(#[case] amount: Decimal) {
        assert_eq!(validate_topup_amount(amount), Ok(()));
    }

    #[rstest]
    #[case(dec!(4.99), AmountError::BelowMinimum { min: MIN_TOPUP })]
    #[case(dec!(10000.01), AmountError::ExceedsMaximum { max: MAX_TOPUP })]
    fn test_topup_out_of_band(#[case] amount: Decimal, #[case] expected: AmountError) {
        assert_eq!(validate_topup_amount(amount), Err(expected));
    }

    #[rstest]
    #[case(dec!(9.99), AmountError::BelowMinimum { min: MIN_LOAN })]
    #[case(dec!(5000.01), AmountError::ExceedsMaximum { max: MAX_LOAN })]
    fn test_loan_out_of_band(#[case] amount: Decimal, #[case] expected: AmountError) {
        assert_eq!(validate_loan_amount(amount), Err(expected));
    }
}
