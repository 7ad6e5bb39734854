//! Error types for vitals intake
//!
//! Request-level failures are [`IngestError`]; every variant maps to a stable,
//! user-facing message and a [`StatusClass`]. Per-sample failures inside a batch
//! are [`SampleRejection`]s, which are collected rather than raised.

use thiserror::Error;

/// Outcome class of a request, independent of the hosting transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Records were persisted (201)
    Created,
    /// Anticipated validation failure (400)
    BadRequest,
    /// Unexpected failure (500)
    InternalError,
}

impl StatusClass {
    /// HTTP-equivalent status code
    pub fn code(&self) -> u16 {
        match self {
            StatusClass::Created => 201,
            StatusClass::BadRequest => 400,
            StatusClass::InternalError => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StatusClass::Created)
    }
}

/// Which part of a request failed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Uploaded batch file
    File,
    /// Raw JSON request body
    Data,
}

impl std::fmt::Display for BodyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyKind::File => f.write_str("file"),
            BodyKind::Data => f.write_str("data"),
        }
    }
}

/// Errors that terminate a whole ingestion request
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid request. Use POST and include a 'file' upload.")]
    MissingUpload,

    #[error("Invalid JSON {0}. Could not decode.")]
    UndecodableBody(BodyKind),

    #[error("Invalid JSON format or type.")]
    MalformedEnvelope,

    #[error("Invalid 'samples' format. It must be a list.")]
    SamplesNotAList,

    #[error("Invalid JSON format. Expected a single object.")]
    NotAnObject,

    #[error("Missing required fields. Need: userid, timestamp, valence, arousal")]
    MissingRequiredField(&'static str),

    #[error("Data validation error: {0}")]
    InvalidFieldType(String),

    #[error("Valence and arousal values must be between 0.0 and 5.0")]
    OutOfRangeValue { field: &'static str, value: f64 },

    #[error("Data validation error: {0}")]
    InvalidTimestamp(#[from] TimestampError),

    #[error("An unexpected server error occurred: {0}")]
    Store(#[from] StoreError),
}

impl IngestError {
    /// Status class this error is reported with
    pub fn status(&self) -> StatusClass {
        match self {
            IngestError::Store(_) => StatusClass::InternalError,
            _ => StatusClass::BadRequest,
        }
    }
}

impl From<SampleRejection> for IngestError {
    fn from(rejection: SampleRejection) -> Self {
        match rejection {
            SampleRejection::NotAnObject => IngestError::NotAnObject,
            SampleRejection::MissingField(field) => IngestError::MissingRequiredField(field),
            SampleRejection::OutOfRange { field, value, .. } => {
                IngestError::OutOfRangeValue { field, value }
            }
            SampleRejection::InvalidTimestamp(e) => IngestError::InvalidTimestamp(e),
            other @ (SampleRejection::NonNumeric { .. } | SampleRejection::InvalidType { .. }) => {
                IngestError::InvalidFieldType(other.to_string())
            }
        }
    }
}

/// Reason a single raw sample was not accepted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleRejection {
    #[error("sample is not a JSON object")]
    NotAnObject,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("could not convert '{field}' to a number")]
    NonNumeric { field: &'static str },

    #[error("field '{field}' has an unsupported type")]
    InvalidType { field: &'static str },

    #[error("'{field}' value {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error(transparent)]
    InvalidTimestamp(#[from] TimestampError),
}

/// Failures while normalizing a timestamp
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("invalid timestamp: epoch value {0} is not a finite number")]
    NotFinite(f64),

    #[error("invalid timestamp: epoch value {0} is out of range")]
    OutOfRange(f64),

    #[error("invalid timestamp: '{0}' is not ISO-8601")]
    Unparseable(String),

    #[error("invalid timestamp: '{0}' has no UTC offset")]
    MissingOffset(String),

    #[error("invalid timestamp: expected epoch milliseconds or an ISO-8601 string")]
    UnsupportedType,
}

/// Persistence failures, surfaced as internal faults
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("corrupt stored record: {0}")]
    CorruptRecord(String),

    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid timezone offset: {0}")]
    InvalidTimezone(String),

    #[error("Invalid default user id: {0}")]
    InvalidUserId(String),

    #[error("Invalid page size: {0}")]
    InvalidPageSize(String),

    #[error("Invalid log configuration: {0}")]
    InvalidLogging(String),
}
