//! Authentication and access control tests
//!
//! Tests for credential validation and role handling.

use proptest::prelude::*;

use shared::models::UserRole;
use shared::validation::{validate_email, validate_password};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        for email in ["trader@mandi.in", "a.b@example.com", "ops+1@firm.co.in"] {
            assert!(validate_email(email).is_ok(), "{} should be valid", email);
        }
    }

    #[test]
    fn test_invalid_emails() {
        for email in ["", "plain", "no-at.com", "a@b"] {
            assert!(validate_email(email).is_err(), "{} should be invalid", email);
        }
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::Admin, UserRole::Operator] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("superuser"), None);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Passwords shorter than 8 characters are always rejected
        #[test]
        fn prop_short_passwords_rejected(password in ".{0,7}") {
            if password.len() < 8 {
                prop_assert!(validate_password(&password).is_err());
            }
        }

        /// Passwords of 8 or more characters pass the length check
        #[test]
        fn prop_long_passwords_accepted(password in ".{8,32}") {
            if password.len() >= 8 {
                prop_assert!(validate_password(&password).is_ok());
            }
        }
    }
}
