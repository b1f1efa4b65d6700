//! Field-level validation for announcement payloads.
//!
//! Every check returns a [`ValidationError`] naming the offending field, so a
//! rejected payload can be logged with the exact path that failed
//! (e.g. `blocks[0].messages[2].username`).

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

pub(crate) const USERNAME_MAX_CHARS: usize = 32;
pub(crate) const MESSAGE_MAX_CHARS: usize = 1024;
pub(crate) const TITLE_MAX_CHARS: usize = 128;
pub(crate) const BLOCK_MAX_MESSAGES: usize = 16;

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    /// Required key not present in the payload
    MissingField,
    /// Present but of the wrong JSON type
    WrongType { expected: &'static str },
    /// String does not match the field's required format
    Pattern { expected: &'static str },
    /// String or array length outside `min..=max`
    Length { min: usize, max: usize, actual: usize },
    /// `level` is not one of the known severities
    UnknownLevel(String),
}

/// A payload rejected during parsing or model construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Path of the offending field, outermost first
    pub field: String,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }

    /// Prefix the field path with its enclosing location.
    pub(crate) fn at(mut self, parent: &str) -> Self {
        self.field = if self.field.is_empty() {
            parent.to_string()
        } else if self.field.starts_with('[') {
            format!("{parent}{}", self.field)
        } else {
            format!("{parent}.{}", self.field)
        };
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = if self.field.is_empty() { "payload" } else { self.field.as_str() };
        match &self.reason {
            ValidationReason::MissingField => write!(f, "{field}: missing required field"),
            ValidationReason::WrongType { expected } => write!(f, "{field}: expected {expected}"),
            ValidationReason::Pattern { expected } => {
                write!(f, "{field}: does not match format {expected}")
            }
            ValidationReason::Length { min, max, actual } => {
                write!(f, "{field}: length {actual} outside allowed range {min}..={max}")
            }
            ValidationReason::UnknownLevel(level) => {
                write!(f, "{field}: unknown level \"{level}\"")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Reject `value` unless its length in characters lies within `min..=max`.
pub(crate) fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::new(
            field,
            ValidationReason::Length { min, max, actual },
        ));
    }
    Ok(())
}

/// Reject a collection whose element count lies outside `min..=max`.
pub(crate) fn check_count(
    field: &str,
    actual: usize,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if actual < min || actual > max {
        return Err(ValidationError::new(
            field,
            ValidationReason::Length { min, max, actual },
        ));
    }
    Ok(())
}

/// 1 to 32 characters from `[A-Za-z0-9_@.-]`.
pub(crate) fn check_username(value: &str) -> Result<(), ValidationError> {
    lazy_static::lazy_static! {
        static ref USERNAME: regex::Regex =
            regex::Regex::new(r"^[A-Za-z0-9_@.\-]{1,32}$").unwrap();
    }
    if USERNAME.is_match(value) {
        return Ok(());
    }
    // Report over-long names as a length problem, everything else as a format problem
    let actual = value.chars().count();
    if actual > USERNAME_MAX_CHARS {
        return Err(ValidationError::new(
            "username",
            ValidationReason::Length { min: 1, max: USERNAME_MAX_CHARS, actual },
        ));
    }
    Err(ValidationError::new(
        "username",
        ValidationReason::Pattern { expected: "[A-Za-z0-9_@.-]{1,32}" },
    ))
}

/// Date and time components of a validated timestamp, used for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TimestampParts {
    pub date: String,
    pub hour: String,
    pub minute: String,
}

/// `YYYY-MM-DDThh:mm[:ss[.fraction]]`, and the date and time must exist on the calendar.
pub(crate) fn check_timestamp(value: &str) -> Result<TimestampParts, ValidationError> {
    lazy_static::lazy_static! {
        static ref TIMESTAMP: regex::Regex = regex::Regex::new(
            r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?$"
        )
        .unwrap();
    }
    let pattern_error = || {
        ValidationError::new(
            "timestamp",
            ValidationReason::Pattern { expected: "YYYY-MM-DDThh:mm[:ss[.fraction]]" },
        )
    };

    let caps = TIMESTAMP.captures(value).ok_or_else(pattern_error)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let (Some(year), Some(month), Some(day), Some(hour), Some(minute)) =
        (num(1), num(2), num(3), num(4), num(5))
    else {
        return Err(pattern_error());
    };
    let second = num(6).unwrap_or(0);

    if NaiveDate::from_ymd_opt(year as i32, month, day).is_none()
        || NaiveTime::from_hms_opt(hour, minute, second).is_none()
    {
        return Err(pattern_error());
    }

    Ok(TimestampParts {
        date: format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]),
        hour: caps[4].to_string(),
        minute: caps[5].to_string(),
    })
}

/// A duration of the form `<days>-hh:mm:ss`.
pub(crate) fn check_expires(value: &str) -> Result<(), ValidationError> {
    lazy_static::lazy_static! {
        static ref EXPIRES: regex::Regex =
            regex::Regex::new(r"^\d+-\d{2}:\d{2}:\d{2}$").unwrap();
    }
    if EXPIRES.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "expires",
            ValidationReason::Pattern { expected: "<days>-hh:mm:ss" },
        ))
    }
}
