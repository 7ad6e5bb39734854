//! Batch envelope validation
//!
//! A batch upload is a JSON object `{"type": "<tag>", "samples": [...]}`. The
//! envelope is checked as a whole before any sample is looked at; a bad
//! envelope rejects the request with zero records written.

use serde_json::Value;

use crate::error::{BodyKind, IngestError};
use crate::types::BatchKind;

/// An envelope that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEnvelope {
    pub kind: BatchKind,
    /// Raw, still untrusted samples
    pub samples: Vec<Value>,
}

/// Decode a request body or uploaded file as JSON
pub fn decode_json(bytes: &[u8], kind: BodyKind) -> Result<Value, IngestError> {
    serde_json::from_slice(bytes).map_err(|_| IngestError::UndecodableBody(kind))
}

/// Validate an uploaded batch file against the route's expected type tag
pub fn validate_envelope(file: &[u8], expected: BatchKind) -> Result<BatchEnvelope, IngestError> {
    let Value::Object(mut document) = decode_json(file, BodyKind::File)? else {
        return Err(IngestError::MalformedEnvelope);
    };

    match document.get("type") {
        Some(Value::String(tag)) if tag == expected.type_tag() => {}
        _ => return Err(IngestError::MalformedEnvelope),
    }

    match document.remove("samples") {
        Some(Value::Array(samples)) => Ok(BatchEnvelope {
            kind: expected,
            samples,
        }),
        _ => Err(IngestError::SamplesNotAList),
    }
}
