//! Transport-agnostic responses
//!
//! Every request ends as a status class plus a JSON body. Hosts translate the
//! class to their own status codes; the body shapes are part of the public
//! contract and must not drift.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::error::{IngestError, StatusClass};
use crate::service::{BatchSummary, EmotionReceipt};
use crate::types::{BatchKind, EmotionSample, RecordId};

pub const EMOTION_RECORDED_MESSAGE: &str = "Successfully recorded emotion data.";

/// Response to one intake request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntakeResponse {
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusClass,
    pub body: Value,
}

fn serialize_status<S: Serializer>(status: &StatusClass, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(status.code())
}

/// Body of a successful batch upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPayload {
    pub message: String,
    pub opportune: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_created: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_ids: Option<Vec<RecordId>>,
}

impl From<&BatchSummary> for BatchPayload {
    fn from(summary: &BatchSummary) -> Self {
        // Health uploads only ever reported the message.
        let detailed = !matches!(summary.kind, BatchKind::HealthData);
        Self {
            message: summary.message(),
            opportune: summary.opportune,
            records_created: detailed.then(|| summary.records_created()),
            record_ids: detailed.then(|| summary.record_ids.clone()),
        }
    }
}

/// Stored emotion record echoed back to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedEmotion {
    pub userid: String,
    /// RFC 3339 in the target zone
    pub timestamp: String,
    pub valence: f64,
    pub arousal: f64,
    #[serde(rename = "type")]
    pub label: String,
}

impl From<&EmotionSample> for ProcessedEmotion {
    fn from(record: &EmotionSample) -> Self {
        Self {
            userid: record.user_id.to_string(),
            timestamp: record.timestamp.to_rfc3339(),
            valence: record.valence,
            arousal: record.arousal,
            label: record.label.clone(),
        }
    }
}

/// Body of a successful single emotion submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionPayload {
    pub message: &'static str,
    pub opportune: bool,
    pub record_id: RecordId,
    pub processed_data: ProcessedEmotion,
}

impl From<&EmotionReceipt> for EmotionPayload {
    fn from(receipt: &EmotionReceipt) -> Self {
        Self {
            message: EMOTION_RECORDED_MESSAGE,
            opportune: receipt.opportune,
            record_id: receipt.record.id,
            processed_data: ProcessedEmotion::from(&receipt.record),
        }
    }
}

impl IntakeResponse {
    pub fn created(body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self {
                status: StatusClass::Created,
                body,
            },
            Err(e) => Self::error(
                StatusClass::InternalError,
                format!("An unexpected server error occurred: {e}"),
            ),
        }
    }

    pub fn error(status: StatusClass, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn from_batch(summary: &BatchSummary) -> Self {
        Self::created(BatchPayload::from(summary))
    }

    pub fn from_receipt(receipt: &EmotionReceipt) -> Self {
        Self::created(EmotionPayload::from(receipt))
    }

    pub fn from_error(err: &IngestError) -> Self {
        Self::error(err.status(), err.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BodyKind;
    use crate::timestamp::TimestampNormalizer;
    use crate::types::UserId;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn summary(kind: BatchKind) -> BatchSummary {
        BatchSummary {
            request_id: Uuid::new_v4(),
            kind,
            user_id: UserId::fallback(),
            record_ids: vec![4, 5],
            skipped: Vec::new(),
            opportune: true,
        }
    }

    #[test]
    fn test_health_batch_payload() {
        let response = IntakeResponse::from_batch(&summary(BatchKind::HealthData));
        assert_eq!(response.status.code(), 201);
        assert_eq!(
            response.body,
            json!({"message": "Successfully processed 2 records.", "opportune": true})
        );
    }

    #[test]
    fn test_heart_rate_batch_payload() {
        let response = IntakeResponse::from_batch(&summary(BatchKind::HeartRate));
        assert_eq!(
            response.body,
            json!({
                "message": "Successfully processed 2 records.",
                "opportune": true,
                "records_created": 2,
                "record_ids": [4, 5]
            })
        );
    }

    #[test]
    fn test_emotion_payload() {
        let record = EmotionSample {
            id: 9,
            user_id: UserId::new("u1").unwrap(),
            timestamp: TimestampNormalizer::default()
                .from_iso("2025-10-21T11:15:00Z")
                .unwrap(),
            valence: 3.0,
            arousal: 2.0,
            label: "periodic".to_string(),
        };
        let response = IntakeResponse::from_receipt(&EmotionReceipt {
            request_id: Uuid::new_v4(),
            record,
            opportune: true,
        });

        assert_eq!(
            response.body,
            json!({
                "message": "Successfully recorded emotion data.",
                "opportune": true,
                "record_id": 9,
                "processed_data": {
                    "userid": "u1",
                    "timestamp": "2025-10-21T16:45:00+05:30",
                    "valence": 3.0,
                    "arousal": 2.0,
                    "type": "periodic"
                }
            })
        );
    }

    #[test]
    fn test_error_payload_and_status_serialization() {
        let response = IntakeResponse::from_error(&IngestError::UndecodableBody(BodyKind::File));
        assert!(!response.is_success());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": 400, "body": {"error": "Invalid JSON file. Could not decode."}})
        );
    }
}
