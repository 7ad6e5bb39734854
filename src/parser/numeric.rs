//! Heart-rate and typed health sample parser

use serde_json::Value;

use super::{present, SampleParser};
use crate::coerce::{self, Coercion};
use crate::error::SampleRejection;
use crate::timestamp::TimestampNormalizer;
use crate::types::{NumericReading, DEFAULT_SAMPLE_TYPE};

/// Field names a numeric sample is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSet {
    /// Epoch-millisecond timestamp field
    pub timestamp: &'static str,
    /// Primary value field
    pub value: &'static str,
    /// Field consulted when the primary value field is absent
    pub value_alias: Option<&'static str>,
    /// Sample type field; `None` for untyped variants
    pub sample_type: Option<&'static str>,
}

/// `{"ts": <ms>, "value": <number>, "type": <string>}`
pub const HEALTH_FIELDS: FieldSet = FieldSet {
    timestamp: "ts",
    value: "value",
    value_alias: None,
    sample_type: Some("type"),
};

/// `{"ts": <ms>, "bpm": <number>}`, with `value` accepted in place of `bpm`
pub const HEART_RATE_FIELDS: FieldSet = FieldSet {
    timestamp: "ts",
    value: "bpm",
    value_alias: Some("value"),
    sample_type: None,
};

/// Parser for `{timestamp, value, type?}` samples
#[derive(Debug, Clone, Copy)]
pub struct NumericSampleParser {
    fields: FieldSet,
    normalizer: TimestampNormalizer,
}

impl NumericSampleParser {
    pub fn new(fields: FieldSet, normalizer: TimestampNormalizer) -> Self {
        Self { fields, normalizer }
    }

    pub fn health(normalizer: TimestampNormalizer) -> Self {
        Self::new(HEALTH_FIELDS, normalizer)
    }

    pub fn heart_rate(normalizer: TimestampNormalizer) -> Self {
        Self::new(HEART_RATE_FIELDS, normalizer)
    }
}

impl SampleParser for NumericSampleParser {
    type Reading = NumericReading;

    fn parse(&self, raw: &Value) -> Result<NumericReading, SampleRejection> {
        let sample = raw.as_object().ok_or(SampleRejection::NotAnObject)?;
        let fields = &self.fields;

        let raw_ts = present(sample, fields.timestamp)
            .ok_or(SampleRejection::MissingField(fields.timestamp))?;

        let (value_field, raw_value) = match present(sample, fields.value) {
            Some(v) => (fields.value, v),
            None => fields
                .value_alias
                .and_then(|alias| present(sample, alias).map(|v| (alias, v)))
                .ok_or(SampleRejection::MissingField(fields.value))?,
        };

        let Coercion::Numeric(millis) = coerce::to_f64(raw_ts) else {
            return Err(SampleRejection::NonNumeric {
                field: fields.timestamp,
            });
        };
        let Coercion::Numeric(value) = coerce::to_f64(raw_value) else {
            return Err(SampleRejection::NonNumeric { field: value_field });
        };

        let sample_type = fields.sample_type.map(|key| {
            present(sample, key).map_or_else(|| DEFAULT_SAMPLE_TYPE.to_string(), coerce::to_label)
        });

        let timestamp = self.normalizer.from_epoch_millis(millis)?;

        Ok(NumericReading {
            timestamp,
            sample_type,
            value,
        })
    }
}
