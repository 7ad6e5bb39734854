//! Core types for the intake pipeline
//!
//! This module defines the data structures that flow through each stage:
//! parsed readings (validated, not yet stored), new records (readings bound to a
//! user), and stored records (with a store-assigned id).

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned record identifier
pub type RecordId = i64;

/// Canonical instant: always carries an explicit offset
pub type Instant = DateTime<FixedOffset>;

/// Sample type assigned to typed health samples that carry no `type` field
pub const DEFAULT_SAMPLE_TYPE: &str = "unknown";

/// Label assigned to emotion samples that carry no `type` field
pub const DEFAULT_EMOTION_LABEL: &str = "periodic";

/// User id recorded for batch uploads that carry none
pub const DEFAULT_USER_ID: &str = "1";

/// Lower bound of the valence/arousal scale (inclusive)
pub const AFFECT_MIN: f64 = 0.0;

/// Upper bound of the valence/arousal scale (inclusive)
pub const AFFECT_MAX: f64 = 5.0;

/// Non-empty user identifier
///
/// Clients send either a string or an integer; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Build a user id from text, rejecting blank input
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == raw.len() {
            Some(UserId(raw))
        } else {
            Some(UserId(trimmed.to_string()))
        }
    }

    /// Read a user id from an untyped JSON value (string or integer)
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => UserId::new(s.as_str()),
            serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => UserId::new(n.to_string()),
            _ => None,
        }
    }

    /// The sentinel user for uploads without a user id
    pub fn fallback() -> Self {
        UserId(DEFAULT_USER_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserId::new(value).ok_or_else(|| "user id must not be empty".to_string())
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Batch routes and their envelope type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    HealthData,
    HeartRate,
    Emotion,
}

impl BatchKind {
    /// Literal the envelope `type` field must carry
    pub fn type_tag(&self) -> &'static str {
        match self {
            BatchKind::HealthData => "health_data_batch",
            BatchKind::HeartRate => "heart_rate_batch",
            BatchKind::Emotion => "emotion_batch",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::HealthData => "health_data",
            BatchKind::HeartRate => "heart_rate",
            BatchKind::Emotion => "emotion",
        }
    }
}

/// Persisted collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Health,
    HeartRate,
    Emotion,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Health => "health_samples",
            Table::HeartRate => "heart_rate_samples",
            Table::Emotion => "emotion_samples",
        }
    }
}

/// Validated numeric reading from a heart-rate or health batch
#[derive(Debug, Clone, PartialEq)]
pub struct NumericReading {
    /// Normalized instant
    pub timestamp: Instant,
    /// Sample type tag, present only for typed health samples
    pub sample_type: Option<String>,
    /// Measured value (bpm for heart rate)
    pub value: f64,
}

/// Validated valence/arousal reading
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionReading {
    /// Normalized instant
    pub timestamp: Instant,
    /// Valence (0-5)
    pub valence: f64,
    /// Arousal (0-5)
    pub arousal: f64,
    /// Free-form label (e.g. "periodic")
    pub label: String,
}

/// Heart-rate sample ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewHeartRateSample {
    pub user_id: UserId,
    pub timestamp: Instant,
    pub value: f64,
}

/// Typed health sample ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewHealthSample {
    pub user_id: UserId,
    pub timestamp: Instant,
    pub sample_type: String,
    pub value: f64,
}

/// Emotion sample ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewEmotionSample {
    pub user_id: UserId,
    pub timestamp: Instant,
    pub valence: f64,
    pub arousal: f64,
    pub label: String,
}

/// Stored heart-rate sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub id: RecordId,
    pub user_id: UserId,
    pub timestamp: Instant,
    /// Heart rate (bpm)
    pub value: f64,
}

/// Stored typed health sample (heart rate, steps, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    pub id: RecordId,
    pub user_id: UserId,
    pub timestamp: Instant,
    #[serde(rename = "type")]
    pub sample_type: String,
    pub value: f64,
}

/// Stored emotion sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionSample {
    pub id: RecordId,
    pub user_id: UserId,
    pub timestamp: Instant,
    pub valence: f64,
    pub arousal: f64,
    #[serde(rename = "type")]
    pub label: String,
}

impl NewHeartRateSample {
    pub fn into_stored(self, id: RecordId) -> HeartRateSample {
        HeartRateSample {
            id,
            user_id: self.user_id,
            timestamp: self.timestamp,
            value: self.value,
        }
    }
}

impl NewHealthSample {
    pub fn into_stored(self, id: RecordId) -> HealthSample {
        HealthSample {
            id,
            user_id: self.user_id,
            timestamp: self.timestamp,
            sample_type: self.sample_type,
            value: self.value,
        }
    }
}

impl NewEmotionSample {
    pub fn into_stored(self, id: RecordId) -> EmotionSample {
        EmotionSample {
            id,
            user_id: self.user_id,
            timestamp: self.timestamp,
            valence: self.valence,
            arousal: self.arousal,
            label: self.label,
        }
    }
}
