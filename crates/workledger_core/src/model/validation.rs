//! Attribute-level validation shared by all drafts.
//!
//! # Invariants
//! - Validation never touches storage; cross-record rules live in
//!   `crate::integrity`.
//! - Error messages never echo user-supplied content.

use crate::model::authority::AuthorityId;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email pattern is a valid regex")
});

/// Malformed or out-of-range attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text is empty after trim.
    BlankField(&'static str),
    /// Text exceeds the column limit.
    TooLong { field: &'static str, max_chars: usize },
    /// Number is negative, NaN or infinite.
    NegativeOrNonFinite(&'static str),
    /// Email does not look like `local@domain.tld`.
    InvalidEmail,
    /// Date text is not `YYYY-MM-DD`.
    InvalidDate(&'static str),
    /// Allocations on a work day would exceed its hours.
    OverAllocated {
        work_day: Uuid,
        available_hours: f64,
        requested_hours: f64,
    },
    /// Authority is inactive or past its expiry date.
    AuthorityNotValid(AuthorityId),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::TooLong { field, max_chars } => {
                write!(f, "`{field}` must be at most {max_chars} characters")
            }
            Self::NegativeOrNonFinite(field) => {
                write!(f, "`{field}` must be a finite number >= 0")
            }
            Self::InvalidEmail => write!(f, "email address is malformed"),
            Self::InvalidDate(field) => write!(f, "`{field}` must be a YYYY-MM-DD date"),
            Self::OverAllocated {
                work_day,
                available_hours,
                requested_hours,
            } => write!(
                f,
                "work day {work_day} has {available_hours}h available, requested {requested_hours}h"
            ),
            Self::AuthorityNotValid(id) => {
                write!(f, "authority {id} is inactive or expired")
            }
        }
    }
}

impl Error for ValidationError {}

/// Checks a required text attribute against its column limit.
pub fn require_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    check_length(field, value, max_chars)
}

/// Checks an optional text attribute against its column limit.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => check_length(field, value, max_chars),
        None => Ok(()),
    }
}

/// Checks that a quantity (hours, rate) is finite and not negative.
pub fn require_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::NegativeOrNonFinite(field));
    }
    Ok(())
}

/// Checks email shape and length.
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    check_length("email", value, 255)?;
    if !EMAIL_PATTERN.is_match(value) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(field))
}

fn check_length(field: &'static str, value: &str, max_chars: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_rejects_blank_and_long_values() {
        assert_eq!(
            require_text("title", "   ", 10),
            Err(ValidationError::BlankField("title"))
        );
        assert_eq!(
            require_text("title", "abcdefghijk", 10),
            Err(ValidationError::TooLong {
                field: "title",
                max_chars: 10
            })
        );
        assert!(require_text("title", "ok", 10).is_ok());
    }

    #[test]
    fn non_negative_rejects_nan_and_negative() {
        assert!(require_non_negative("hours", 0.0).is_ok());
        assert!(require_non_negative("hours", -0.5).is_err());
        assert!(require_non_negative("hours", f64::NAN).is_err());
        assert!(require_non_negative("hours", f64::INFINITY).is_err());
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(validate_email("ops@acme.example").is_ok());
        assert!(validate_email("first.last+tag@mail.acme.co.uk").is_ok());
        assert_eq!(validate_email("no-at-sign"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a@b"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a b@acme.io"), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn parse_date_accepts_iso_dates_only() {
        let date = parse_date("expires_at", " 2027-02-28 ").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2027, 2, 28).unwrap());
        assert_eq!(
            parse_date("expires_at", "2027-02-30"),
            Err(ValidationError::InvalidDate("expires_at"))
        );
        assert_eq!(
            parse_date("expires_at", "28/02/2027"),
            Err(ValidationError::InvalidDate("expires_at"))
        );
    }
}
