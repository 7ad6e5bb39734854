//! Timestamp normalization
//!
//! Every stored sample carries an instant expressed in one target timezone.
//! Clients send either epoch milliseconds or ISO-8601 strings; both are mapped
//! onto the target offset here. Naive ISO strings (no offset, no `Z`) are
//! rejected rather than guessed.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use serde_json::Value;

use crate::error::TimestampError;
use crate::types::Instant;

/// India Standard Time, UTC+05:30
pub const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

/// Offset-qualified layouts accepted besides strict RFC 3339
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
];

/// Layouts that parse but carry no offset
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Default target zone (IST)
pub fn india_standard_time() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// Converts raw timestamps into canonical instants in a fixed target zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampNormalizer {
    target: FixedOffset,
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        Self::new(india_standard_time())
    }
}

impl TimestampNormalizer {
    /// Create a normalizer for the given target offset
    pub fn new(target: FixedOffset) -> Self {
        Self { target }
    }

    pub fn target(&self) -> FixedOffset {
        self.target
    }

    /// Normalize an untyped JSON timestamp
    ///
    /// Numbers are epoch milliseconds, strings are ISO-8601; anything else fails.
    pub fn normalize(&self, raw: &Value) -> Result<Instant, TimestampError> {
        match raw {
            Value::Number(n) => {
                let millis = n.as_f64().ok_or(TimestampError::UnsupportedType)?;
                self.from_epoch_millis(millis)
            }
            Value::String(s) => self.from_iso(s),
            _ => Err(TimestampError::UnsupportedType),
        }
    }

    /// Interpret `millis` as milliseconds since the Unix epoch (UTC)
    ///
    /// Precision is kept down to the microsecond.
    pub fn from_epoch_millis(&self, millis: f64) -> Result<Instant, TimestampError> {
        if !millis.is_finite() {
            return Err(TimestampError::NotFinite(millis));
        }

        let micros = (millis * 1000.0).round();
        if micros.abs() >= i64::MAX as f64 {
            return Err(TimestampError::OutOfRange(millis));
        }
        let micros = micros as i64;

        let seconds = micros.div_euclid(1_000_000);
        let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;

        DateTime::<Utc>::from_timestamp(seconds, nanos)
            .map(|utc| utc.with_timezone(&self.target))
            .ok_or(TimestampError::OutOfRange(millis))
    }

    /// Parse an ISO-8601 string carrying an explicit offset or a trailing `Z`
    pub fn from_iso(&self, raw: &str) -> Result<Instant, TimestampError> {
        let trimmed = raw.trim();
        let candidate = match trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix('z')) {
            Some(stem) => format!("{stem}+00:00"),
            None => trimmed.to_string(),
        };

        if let Some(parsed) = parse_with_offset(&candidate) {
            return Ok(parsed.with_timezone(&self.target));
        }

        if is_naive(&candidate) {
            Err(TimestampError::MissingOffset(raw.to_string()))
        } else {
            Err(TimestampError::Unparseable(raw.to_string()))
        }
    }
}

fn parse_with_offset(candidate: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(candidate).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(candidate, format).ok())
    })
}

fn is_naive(candidate: &str) -> bool {
    NAIVE_FORMATS
        .iter()
        .any(|format| NaiveDateTime::parse_from_str(candidate, format).is_ok())
        || NaiveDate::parse_from_str(candidate, "%Y-%m-%d").is_ok()
}
