//! Valence/arousal sample parser
//!
//! Checks run in a fixed order: required fields, numeric coercion, range,
//! then timestamp. The first failing stage decides the rejection.

use serde_json::{Map, Value};

use super::{present, SampleParser};
use crate::coerce::{self, Coercion};
use crate::error::SampleRejection;
use crate::timestamp::TimestampNormalizer;
use crate::types::{EmotionReading, UserId, AFFECT_MAX, AFFECT_MIN, DEFAULT_EMOTION_LABEL};

/// Timestamp keys, in lookup order
const TIMESTAMP_KEYS: [&str; 2] = ["timestamp", "ts"];

/// A single emotion submission: reading plus the submitting user
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionSubmission {
    pub user_id: UserId,
    pub reading: EmotionReading,
}

/// Parser for `{timestamp|ts, valence, arousal, type?}` samples
#[derive(Debug, Clone, Copy, Default)]
pub struct EmotionSampleParser {
    normalizer: TimestampNormalizer,
}

impl EmotionSampleParser {
    pub fn new(normalizer: TimestampNormalizer) -> Self {
        Self { normalizer }
    }

    /// Parse a standalone submission that must also carry `userid`
    pub fn parse_submission(&self, raw: &Value) -> Result<EmotionSubmission, SampleRejection> {
        let sample = raw.as_object().ok_or(SampleRejection::NotAnObject)?;

        let raw_user = present(sample, "userid").ok_or(SampleRejection::MissingField("userid"))?;
        // Presence of the remaining fields is checked before the user id type.
        let fields = ReadingFields::extract(sample)?;

        let user_id = match UserId::from_json(raw_user) {
            Some(id) => id,
            None if raw_user.is_string() => return Err(SampleRejection::MissingField("userid")),
            None => return Err(SampleRejection::InvalidType { field: "userid" }),
        };

        let reading = self.read(sample, fields)?;
        Ok(EmotionSubmission { user_id, reading })
    }

    fn read(
        &self,
        sample: &Map<String, Value>,
        fields: ReadingFields<'_>,
    ) -> Result<EmotionReading, SampleRejection> {
        let valence = coerce_affect("valence", fields.valence)?;
        let arousal = coerce_affect("arousal", fields.arousal)?;
        let valence = within_affect_range("valence", valence)?;
        let arousal = within_affect_range("arousal", arousal)?;

        let timestamp = self.normalizer.normalize(fields.timestamp)?;

        let label = present(sample, "type")
            .map_or_else(|| DEFAULT_EMOTION_LABEL.to_string(), coerce::to_label);

        Ok(EmotionReading {
            timestamp,
            valence,
            arousal,
            label,
        })
    }
}

impl SampleParser for EmotionSampleParser {
    type Reading = EmotionReading;

    fn parse(&self, raw: &Value) -> Result<EmotionReading, SampleRejection> {
        let sample = raw.as_object().ok_or(SampleRejection::NotAnObject)?;
        let fields = ReadingFields::extract(sample)?;
        self.read(sample, fields)
    }
}

/// Required reading fields, present and non-null but not yet validated
#[derive(Clone, Copy)]
struct ReadingFields<'a> {
    timestamp: &'a Value,
    valence: &'a Value,
    arousal: &'a Value,
}

impl<'a> ReadingFields<'a> {
    fn extract(sample: &'a Map<String, Value>) -> Result<Self, SampleRejection> {
        let timestamp = TIMESTAMP_KEYS
            .iter()
            .find_map(|key| present(sample, key))
            .ok_or(SampleRejection::MissingField("timestamp"))?;
        let valence = present(sample, "valence").ok_or(SampleRejection::MissingField("valence"))?;
        let arousal = present(sample, "arousal").ok_or(SampleRejection::MissingField("arousal"))?;
        Ok(Self {
            timestamp,
            valence,
            arousal,
        })
    }
}

fn coerce_affect(field: &'static str, raw: &Value) -> Result<f64, SampleRejection> {
    match coerce::to_f64(raw) {
        Coercion::Numeric(v) => Ok(v),
        Coercion::NonCoercible => Err(SampleRejection::NonNumeric { field }),
    }
}

fn within_affect_range(field: &'static str, value: f64) -> Result<f64, SampleRejection> {
    if (AFFECT_MIN..=AFFECT_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(SampleRejection::OutOfRange {
            field,
            value,
            min: AFFECT_MIN,
            max: AFFECT_MAX,
        })
    }
}
