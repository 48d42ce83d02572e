//! Input validation
//!
//! Each field type gets a post-validator that is deliberately stricter than
//! its extraction regex: extraction finds a candidate in noisy speech,
//! validation decides whether the candidate is a value we are willing to
//! persist. A failure here is a normal retry outcome for the dialog
//! controller, not an exception.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::extract::FieldType;

/// Why a candidate value was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("nothing usable was said for {0:?}")]
    Missing(FieldType),
    #[error("{field:?} value {value:?} failed validation")]
    Invalid { field: FieldType, value: String },
}

static EMAIL_STRICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap()
});

/// Validate and canonicalize a candidate value for a field.
///
/// Returns the canonical form that goes into collected data.
pub fn validate(field: FieldType, raw: &str) -> Result<String, ValidationFailure> {
    let reject = || ValidationFailure::Invalid {
        field,
        value: raw.to_string(),
    };

    match field {
        FieldType::Phone => {
            let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
            // Strip country code / trunk prefix before judging the number
            let national = if digits.len() == 12 && digits.starts_with("91") {
                &digits[2..]
            } else if digits.len() == 11 && digits.starts_with('0') {
                &digits[1..]
            } else {
                digits.as_str()
            };
            if national.len() == 10 && national.starts_with(['6', '7', '8', '9']) {
                Ok(national.to_string())
            } else {
                Err(reject())
            }
        }
        FieldType::Pincode => {
            let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() == 6 && !digits.starts_with('0') {
                Ok(digits)
            } else {
                Err(reject())
            }
        }
        FieldType::Email => {
            let trimmed = raw.trim();
            if trimmed.len() <= 254 && EMAIL_STRICT.is_match(trimmed) {
                Ok(trimmed.to_lowercase())
            } else {
                Err(reject())
            }
        }
        FieldType::Name => {
            let trimmed = raw.trim();
            let ok_chars = trimmed
                .chars()
                .all(|c| c.is_alphabetic() || c == ' ' || c == '.' || c == '\'');
            if (2..=60).contains(&trimmed.chars().count()) && ok_chars {
                Ok(trimmed.to_string())
            } else {
                Err(reject())
            }
        }
        FieldType::Address => {
            let trimmed = raw.trim();
            if trimmed.chars().count() >= 8 {
                Ok(trimmed.to_string())
            } else {
                Err(reject())
            }
        }
        FieldType::Model => {
            let trimmed = raw.trim();
            if (2..=30).contains(&trimmed.chars().count()) {
                Ok(trimmed.to_string())
            } else {
                Err(reject())
            }
        }
        FieldType::Budget => {
            let amount: f64 = raw.parse().map_err(|_| reject())?;
            if (1_000.0..=1_000_000_000.0).contains(&amount) {
                Ok(format!("{}", amount as i64))
            } else {
                Err(reject())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_strips_country_code() {
        assert_eq!(validate(FieldType::Phone, "+91 9876543210").unwrap(), "9876543210");
        assert_eq!(validate(FieldType::Phone, "09876543210").unwrap(), "9876543210");
    }

    #[test]
    fn test_phone_first_digit_rule() {
        assert!(validate(FieldType::Phone, "5876543210").is_err());
        assert!(validate(FieldType::Phone, "987654321").is_err());
    }

    #[test]
    fn test_pincode_first_digit_rule() {
        assert_eq!(validate(FieldType::Pincode, "305001").unwrap(), "305001");
        assert!(validate(FieldType::Pincode, "012345").is_err());
        assert!(validate(FieldType::Pincode, "30500").is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(
            validate(FieldType::Email, "Rahul.K@Example.com").unwrap(),
            "rahul.k@example.com"
        );
        assert!(validate(FieldType::Email, "not-an-email").is_err());
        assert!(validate(FieldType::Email, "a@b").is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(validate(FieldType::Name, "Rahul Sharma").unwrap(), "Rahul Sharma");
        assert!(validate(FieldType::Name, "R2D2").is_err());
        assert!(validate(FieldType::Name, "x").is_err());
    }

    #[test]
    fn test_budget_range() {
        assert_eq!(validate(FieldType::Budget, "500000").unwrap(), "500000");
        assert!(validate(FieldType::Budget, "12").is_err());
        assert!(validate(FieldType::Budget, "grapes").is_err());
    }

    #[test]
    fn test_address_minimum_length() {
        assert!(validate(FieldType::Address, "12 MG Road, Jaipur").is_ok());
        assert!(validate(FieldType::Address, "here").is_err());
    }
}
