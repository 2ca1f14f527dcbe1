//! Validation helpers for form inputs.

use validator::ValidationError;

use crate::state::game::{Digit, InvalidDigit};

/// Validates that a guess is a run of ASCII digits whose value lies in 0..=9.
///
/// ```ignore
/// validate_guess("7")  // Ok
/// validate_guess("07") // Ok, same as 7
/// validate_guess("10") // Err - out of range
/// validate_guess("-1") // Err - not decimal
/// ```
pub fn validate_guess(raw: &str) -> Result<(), ValidationError> {
    match raw.parse::<Digit>() {
        Ok(_) => Ok(()),
        Err(InvalidDigit::NotDecimal(_)) => {
            let mut err = ValidationError::new("guess_format");
            err.message = Some("Guess must contain only the digits 0-9".into());
            Err(err)
        }
        Err(InvalidDigit::OutOfRange(_)) => {
            let mut err = ValidationError::new("guess_range");
            err.message = Some("Guess must be between 0 and 9".into());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_guess_valid() {
        assert!(validate_guess("0").is_ok());
        assert!(validate_guess("9").is_ok());
        assert!(validate_guess("07").is_ok());
    }

    #[test]
    fn test_validate_guess_invalid_format() {
        for raw in ["", "abc", "-1", "3.5", " 4", "+4", "٣"] {
            let err = validate_guess(raw).unwrap_err();
            assert_eq!(err.code, "guess_format", "input {raw:?}");
        }
    }

    #[test]
    fn test_validate_guess_out_of_range() {
        for raw in ["10", "99", "18446744073709551616"] {
            let err = validate_guess(raw).unwrap_err();
            assert_eq!(err.code, "guess_range", "input {raw:?}");
        }
    }
}
