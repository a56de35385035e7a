//! Phone number type.
//!
//! Phone numbers are the login identity on the marketplace, so user input is
//! validated and normalized before it reaches the auth endpoints.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains something other than digits, separators and a leading +.
    #[error("phone number contains invalid character '{0}'")]
    InvalidCharacter(char),
    /// Too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    BadLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number, normalized to digits with an optional leading `+`.
///
/// Spaces, dashes, dots and parentheses are stripped during parsing, so
/// `"+255 712-345-678"` and `"+255712345678"` compare equal.
///
/// ## Examples
///
/// ```
/// use tz_materials_core::Phone;
///
/// assert_eq!(Phone::parse("+255 712 345 678").unwrap().as_str(), "+255712345678");
/// assert_eq!(Phone::parse("0712-345-678").unwrap().as_str(), "0712345678");
/// assert!(Phone::parse("").is_err());
/// assert!(Phone::parse("call me").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits (local numbers without country code).
    pub const MIN_DIGITS: usize = 9;
    /// Maximum number of digits (E.164 limit).
    pub const MAX_DIGITS: usize = 15;

    /// Parse and normalize a `Phone` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains letters or other
    /// symbols, or has fewer than 9 or more than 15 digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }

        let mut normalized = String::with_capacity(trimmed.len());
        for (i, c) in trimmed.chars().enumerate() {
            match c {
                '0'..='9' => normalized.push(c),
                '+' if i == 0 => normalized.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                other => return Err(PhoneError::InvalidCharacter(other)),
            }
        }

        let digits = normalized.chars().filter(char::is_ascii_digit).count();
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits) {
            return Err(PhoneError::BadLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(normalized))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_separators() {
        let phone = Phone::parse(" +255 (712) 345-678 ").unwrap();
        assert_eq!(phone.as_str(), "+255712345678");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Phone::parse("   "), Err(PhoneError::Empty));
    }

    #[test]
    fn test_plus_only_allowed_first() {
        assert_eq!(
            Phone::parse("255+712345678"),
            Err(PhoneError::InvalidCharacter('+'))
        );
    }

    #[test]
    fn test_parse_rejects_letters() {
        assert_eq!(
            Phone::parse("0712abc678"),
            Err(PhoneError::InvalidCharacter('a'))
        );
    }

    #[test]
    fn test_parse_length_bounds() {
        assert!(matches!(
            Phone::parse("12345678"),
            Err(PhoneError::BadLength { .. })
        ));
        assert!(matches!(
            Phone::parse("+1234567890123456"),
            Err(PhoneError::BadLength { .. })
        ));
        assert!(Phone::parse("123456789").is_ok());
    }

    #[test]
    fn test_deserialize_does_not_revalidate() {
        // Server-issued values are taken as-is.
        let phone: Phone = serde_json::from_str("\"ops\"").unwrap();
        assert_eq!(phone.as_str(), "ops");
    }
}
