//! Sample parsers
//!
//! This module provides parsers that turn one raw, untrusted JSON sample into a
//! validated reading. Parsers are pure: a bad sample yields a
//! [`SampleRejection`], never a panic or a side effect.

mod emotion;
mod numeric;

pub use emotion::{EmotionSampleParser, EmotionSubmission};
pub use numeric::{FieldSet, NumericSampleParser, HEALTH_FIELDS, HEART_RATE_FIELDS};

use serde_json::{Map, Value};

use crate::error::SampleRejection;

/// Trait for per-sample parsers
pub trait SampleParser {
    /// Validated output of a successful parse
    type Reading;

    /// Parse one raw sample
    fn parse(&self, raw: &Value) -> Result<Self::Reading, SampleRejection>;
}

/// Look up a field, treating an explicit `null` as absent
fn present<'a>(sample: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    sample.get(key).filter(|v| !v.is_null())
}
