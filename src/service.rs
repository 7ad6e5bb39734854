//! Ingestion service
//!
//! This module provides the public entry points of vitals intake. It drives a
//! request through validation and persistence:
//!
//! 1. Batch envelope validation (batch routes only)
//! 2. Per-sample parsing with soft-skip
//! 3. Persistence through [`SampleStore`]
//! 4. Summary for the response mapper
//!
//! The service is stateless apart from the shared store; requests can be
//! handled concurrently from several threads.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::IntakeConfig;
use crate::envelope::{decode_json, validate_envelope};
use crate::error::{BodyKind, IngestError, SampleRejection, StatusClass};
use crate::parser::{EmotionSampleParser, NumericSampleParser, SampleParser};
use crate::response::IntakeResponse;
use crate::store::{SampleStore, StoreResult};
use crate::timestamp::TimestampNormalizer;
use crate::types::{
    BatchKind, EmotionSample, NewEmotionSample, NewHealthSample, NewHeartRateSample, RecordId,
    UserId,
};

/// A batch upload as received from the transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchUpload {
    /// Raw bytes of the uploaded file part; `None` when no file was sent
    pub file: Option<Vec<u8>>,
    /// Optional `userid` form field
    pub user_id: Option<String>,
}

impl BatchUpload {
    pub fn new(file: impl Into<Vec<u8>>) -> Self {
        Self {
            file: Some(file.into()),
            user_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// One inbound request, routed by entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeRequest {
    HealthBatch(BatchUpload),
    HeartRateBatch(BatchUpload),
    EmotionBatch(BatchUpload),
    /// Single emotion record as a raw JSON body
    Emotion(Vec<u8>),
}

/// A sample excluded from a batch, with its position in `samples`
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSample {
    pub index: usize,
    pub reason: SampleRejection,
}

/// Outcome of a processed batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub request_id: Uuid,
    pub kind: BatchKind,
    /// User every record of the batch was stored under
    pub user_id: UserId,
    /// Ids of created records, in sample order
    pub record_ids: Vec<RecordId>,
    pub skipped: Vec<SkippedSample>,
    pub opportune: bool,
}

impl BatchSummary {
    pub fn records_created(&self) -> usize {
        self.record_ids.len()
    }

    pub fn message(&self) -> String {
        format!("Successfully processed {} records.", self.records_created())
    }
}

/// Outcome of a single emotion submission
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionReceipt {
    pub request_id: Uuid,
    pub record: EmotionSample,
    pub opportune: bool,
}

/// Validates and persists uploaded samples
pub struct IntakeService {
    store: Arc<dyn SampleStore>,
    config: IntakeConfig,
}

impl IntakeService {
    pub fn new(store: Arc<dyn SampleStore>, config: IntakeConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SampleStore> {
        &self.store
    }

    /// Route a request and map its outcome to a response
    pub fn handle(&self, request: IntakeRequest) -> IntakeResponse {
        let outcome = match request {
            IntakeRequest::HealthBatch(upload) => self
                .upload_health_batch(&upload)
                .map(|summary| IntakeResponse::from_batch(&summary)),
            IntakeRequest::HeartRateBatch(upload) => self
                .upload_heart_rate_batch(&upload)
                .map(|summary| IntakeResponse::from_batch(&summary)),
            IntakeRequest::EmotionBatch(upload) => self
                .upload_emotion_batch(&upload)
                .map(|summary| IntakeResponse::from_batch(&summary)),
            IntakeRequest::Emotion(body) => self
                .submit_emotion(&body)
                .map(|receipt| IntakeResponse::from_receipt(&receipt)),
        };
        outcome.unwrap_or_else(|err| IntakeResponse::from_error(&err))
    }

    /// Ingest a `health_data_batch` upload
    pub fn upload_health_batch(&self, upload: &BatchUpload) -> Result<BatchSummary, IngestError> {
        let parser = NumericSampleParser::health(self.normalizer());
        self.ingest_batch(BatchKind::HealthData, upload, &parser, |user_id, reading| {
            let stored = self.store.insert_health(NewHealthSample {
                user_id: user_id.clone(),
                timestamp: reading.timestamp,
                // The typed parser always fills in the sample type.
                sample_type: reading.sample_type.unwrap_or_default(),
                value: reading.value,
            })?;
            Ok(stored.id)
        })
    }

    /// Ingest a `heart_rate_batch` upload
    pub fn upload_heart_rate_batch(
        &self,
        upload: &BatchUpload,
    ) -> Result<BatchSummary, IngestError> {
        let parser = NumericSampleParser::heart_rate(self.normalizer());
        self.ingest_batch(BatchKind::HeartRate, upload, &parser, |user_id, reading| {
            let stored = self.store.insert_heart_rate(NewHeartRateSample {
                user_id: user_id.clone(),
                timestamp: reading.timestamp,
                value: reading.value,
            })?;
            Ok(stored.id)
        })
    }

    /// Ingest an `emotion_batch` upload
    pub fn upload_emotion_batch(&self, upload: &BatchUpload) -> Result<BatchSummary, IngestError> {
        let parser = EmotionSampleParser::new(self.normalizer());
        self.ingest_batch(BatchKind::Emotion, upload, &parser, |user_id, reading| {
            let stored = self.store.insert_emotion(NewEmotionSample {
                user_id: user_id.clone(),
                timestamp: reading.timestamp,
                valence: reading.valence,
                arousal: reading.arousal,
                label: reading.label,
            })?;
            Ok(stored.id)
        })
    }

    /// Validate and store one emotion record
    ///
    /// Unlike batches, any validation failure rejects the whole request.
    pub fn submit_emotion(&self, body: &[u8]) -> Result<EmotionReceipt, IngestError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("emotion_submission", %request_id);
        let _guard = span.enter();

        let outcome = self.record_emotion(request_id, body);
        match &outcome {
            Ok(receipt) => info!(
                record_id = receipt.record.id,
                user_id = %receipt.record.user_id,
                "recorded emotion sample"
            ),
            Err(err) => log_failure(err),
        }
        outcome
    }

    fn record_emotion(&self, request_id: Uuid, body: &[u8]) -> Result<EmotionReceipt, IngestError> {
        let document = decode_json(body, BodyKind::Data)?;
        if !matches!(document, Value::Object(_)) {
            return Err(IngestError::NotAnObject);
        }

        let submission = EmotionSampleParser::new(self.normalizer()).parse_submission(&document)?;
        let record = self.store.insert_emotion(NewEmotionSample {
            user_id: submission.user_id,
            timestamp: submission.reading.timestamp,
            valence: submission.reading.valence,
            arousal: submission.reading.arousal,
            label: submission.reading.label,
        })?;

        Ok(EmotionReceipt {
            request_id,
            record,
            opportune: self.config.opportune,
        })
    }

    fn ingest_batch<P: SampleParser>(
        &self,
        kind: BatchKind,
        upload: &BatchUpload,
        parser: &P,
        persist: impl FnMut(&UserId, P::Reading) -> StoreResult<RecordId>,
    ) -> Result<BatchSummary, IngestError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("batch_upload", %request_id, kind = kind.as_str());
        let _guard = span.enter();

        let outcome = self.process_batch(request_id, kind, upload, parser, persist);
        match &outcome {
            Ok(summary) => info!(
                user_id = %summary.user_id,
                records_created = summary.records_created(),
                skipped = summary.skipped.len(),
                "processed batch"
            ),
            Err(err) => log_failure(err),
        }
        outcome
    }

    fn process_batch<P: SampleParser>(
        &self,
        request_id: Uuid,
        kind: BatchKind,
        upload: &BatchUpload,
        parser: &P,
        mut persist: impl FnMut(&UserId, P::Reading) -> StoreResult<RecordId>,
    ) -> Result<BatchSummary, IngestError> {
        let file = upload.file.as_deref().ok_or(IngestError::MissingUpload)?;
        let envelope = validate_envelope(file, kind)?;
        let user_id = self.resolve_user(upload.user_id.as_deref());

        let mut summary = BatchSummary {
            request_id,
            kind,
            user_id,
            record_ids: Vec::with_capacity(envelope.samples.len()),
            skipped: Vec::new(),
            opportune: self.config.opportune,
        };

        for (index, raw) in envelope.samples.iter().enumerate() {
            match parser.parse(raw) {
                Ok(reading) => {
                    // Records written before a store failure stay committed.
                    let id = persist(&summary.user_id, reading)?;
                    summary.record_ids.push(id);
                }
                Err(reason) => {
                    debug!(index, %reason, "skipped sample");
                    summary.skipped.push(SkippedSample { index, reason });
                }
            }
        }

        Ok(summary)
    }

    fn resolve_user(&self, raw: Option<&str>) -> UserId {
        raw.and_then(UserId::new)
            .unwrap_or_else(|| self.config.default_user_id.clone())
    }

    fn normalizer(&self) -> TimestampNormalizer {
        self.config.normalizer()
    }
}

fn log_failure(err: &IngestError) {
    match err.status() {
        StatusClass::InternalError => error!(error = %err, "request failed"),
        _ => warn!(error = %err, "request rejected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{MemoryStore, SliceQuery};
    use crate::types::{
        EmotionSample, HealthSample, HeartRateSample, NewEmotionSample, NewHealthSample,
        NewHeartRateSample, Table,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service() -> (IntakeService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = IntakeService::new(store.clone(), IntakeConfig::default());
        (service, store)
    }

    fn upload(document: Value) -> BatchUpload {
        BatchUpload::new(document.to_string())
    }

    fn all() -> SliceQuery {
        SliceQuery {
            user_id: None,
            offset: 0,
            limit: 100,
        }
    }

    #[test]
    fn test_heart_rate_batch_soft_skips_bad_samples() {
        let (service, store) = service();
        let summary = service
            .upload_heart_rate_batch(&upload(json!({
                "type": "heart_rate_batch",
                "samples": [
                    {"ts": 0, "bpm": 60},
                    {"ts": 1000},
                    {"ts": 2000, "bpm": "abc"},
                    {"ts": 3000, "bpm": "72"},
                    "not a sample"
                ]
            })))
            .unwrap();

        assert_eq!(summary.records_created(), 2);
        assert_eq!(summary.record_ids, vec![1, 2]);
        let skipped: Vec<usize> = summary.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2, 4]);
        assert_eq!(summary.skipped[0].reason, SampleRejection::MissingField("bpm"));
        assert_eq!(summary.message(), "Successfully processed 2 records.");

        let rows = store.heart_rate_samples(&all()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp.to_rfc3339(), "1970-01-01T05:30:00+05:30");
        assert_eq!(rows[1].value, 72.0);
    }

    #[test]
    fn test_records_created_equals_input_when_all_valid() {
        let (service, _) = service();
        let samples: Vec<Value> = (0..10)
            .map(|i| json!({"ts": i * 1000, "type": "steps", "value": i}))
            .collect();
        let summary = service
            .upload_health_batch(&upload(json!({
                "type": "health_data_batch",
                "samples": samples
            })))
            .unwrap();
        assert_eq!(summary.records_created(), 10);
        assert!(summary.skipped.is_empty());
    }

    #[test]
    fn test_wrong_envelope_type_writes_nothing() {
        let (service, store) = service();
        let err = service
            .upload_health_batch(&upload(json!({
                "type": "heart_rate_batch",
                "samples": [{"ts": 0, "type": "hr", "value": 60}]
            })))
            .unwrap_err();

        assert!(matches!(err, IngestError::MalformedEnvelope));
        assert_eq!(err.status().code(), 400);
        assert_eq!(store.count(Table::Health, None).unwrap(), 0);
    }

    #[test]
    fn test_malformed_json_on_every_route() {
        let (service, store) = service();
        let garbage = BatchUpload::new("{\"type\": ");

        for result in [
            service.upload_health_batch(&garbage),
            service.upload_heart_rate_batch(&garbage),
            service.upload_emotion_batch(&garbage),
        ] {
            assert!(matches!(
                result,
                Err(IngestError::UndecodableBody(BodyKind::File))
            ));
        }
        assert!(matches!(
            service.submit_emotion(b"not json"),
            Err(IngestError::UndecodableBody(BodyKind::Data))
        ));

        for table in [Table::Health, Table::HeartRate, Table::Emotion] {
            assert_eq!(store.count(table, None).unwrap(), 0);
        }
    }

    #[test]
    fn test_missing_file_part() {
        let (service, _) = service();
        let err = service
            .upload_heart_rate_batch(&BatchUpload::default())
            .unwrap_err();
        assert!(matches!(err, IngestError::MissingUpload));
    }

    #[test]
    fn test_default_and_explicit_user() {
        let (service, store) = service();
        let document = json!({"type": "heart_rate_batch", "samples": [{"ts": 0, "bpm": 60}]});

        service.upload_heart_rate_batch(&upload(document.clone())).unwrap();
        service
            .upload_heart_rate_batch(&upload(document.clone()).with_user_id(""))
            .unwrap();
        service
            .upload_heart_rate_batch(&upload(document).with_user_id("42"))
            .unwrap();

        let users: Vec<String> = store
            .heart_rate_samples(&all())
            .unwrap()
            .into_iter()
            .map(|s| s.user_id.to_string())
            .collect();
        assert_eq!(users, vec!["1", "1", "42"]);
    }

    #[test]
    fn test_emotion_batch() {
        let (service, store) = service();
        let summary = service
            .upload_emotion_batch(
                &upload(json!({
                    "type": "emotion_batch",
                    "samples": [
                        {"ts": 0, "valence": 5.0, "arousal": 0.0},
                        {"ts": 0, "valence": 5.0001, "arousal": 1.0},
                        {"timestamp": "2025-10-21T11:15:00Z", "valence": "3.2", "arousal": 2, "type": "prompted"}
                    ]
                }))
                .with_user_id("u9"),
            )
            .unwrap();

        assert_eq!(summary.record_ids, vec![1, 2]);
        assert!(matches!(
            summary.skipped[0].reason,
            SampleRejection::OutOfRange { field: "valence", .. }
        ));

        let rows = store.emotion_samples(&all()).unwrap();
        assert_eq!(rows[1].label, "prompted");
        assert_eq!(rows[1].user_id.as_str(), "u9");
    }

    #[test]
    fn test_emotion_submission_round_trip() {
        let (service, store) = service();
        let body = json!({
            "userid": "u1",
            "timestamp": "2025-10-21T11:15:00Z",
            "valence": 3.0,
            "arousal": 2.0
        })
        .to_string();

        let receipt = service.submit_emotion(body.as_bytes()).unwrap();
        assert!(receipt.opportune);

        let rows = store.emotion_samples(&all()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], receipt.record);
        assert_eq!(rows[0].valence, 3.0);
        assert_eq!(rows[0].arousal, 2.0);
        assert_eq!(rows[0].timestamp.to_rfc3339(), "2025-10-21T16:45:00+05:30");
    }

    #[test]
    fn test_emotion_submission_rejections() {
        let (service, store) = service();

        let cases: Vec<(Value, &str)> = vec![
            (
                json!([1, 2]),
                "Invalid JSON format. Expected a single object.",
            ),
            (
                json!({"userid": "u1", "valence": 1, "arousal": 1}),
                "Missing required fields. Need: userid, timestamp, valence, arousal",
            ),
            (
                json!({"userid": "u1", "ts": 0, "valence": 6, "arousal": 1}),
                "Valence and arousal values must be between 0.0 and 5.0",
            ),
            (
                json!({"userid": "u1", "ts": 0, "valence": "abc", "arousal": 1}),
                "Data validation error: could not convert 'valence' to a number",
            ),
        ];

        for (body, message) in cases {
            let err = service.submit_emotion(body.to_string().as_bytes()).unwrap_err();
            assert_eq!(err.status(), StatusClass::BadRequest);
            assert_eq!(err.to_string(), message);
        }

        let err = service
            .submit_emotion(br#"{"userid": "u1", "ts": "yesterday", "valence": 1, "arousal": 1}"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("Data validation error: invalid timestamp"));

        assert_eq!(store.count(Table::Emotion, None).unwrap(), 0);
    }

    /// Delegates to a `MemoryStore` until its insert budget runs out
    struct FlakyStore {
        inner: MemoryStore,
        inserts_left: AtomicUsize,
    }

    impl FlakyStore {
        fn failing_after(inserts: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                inserts_left: AtomicUsize::new(inserts),
            }
        }

        fn take_insert(&self) -> StoreResult<()> {
            self.inserts_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .map(|_| ())
                .map_err(|_| StoreError::Poisoned)
        }
    }

    impl SampleStore for FlakyStore {
        fn insert_health(&self, sample: NewHealthSample) -> StoreResult<HealthSample> {
            self.take_insert()?;
            self.inner.insert_health(sample)
        }
        fn insert_heart_rate(&self, sample: NewHeartRateSample) -> StoreResult<HeartRateSample> {
            self.take_insert()?;
            self.inner.insert_heart_rate(sample)
        }
        fn insert_emotion(&self, sample: NewEmotionSample) -> StoreResult<EmotionSample> {
            self.take_insert()?;
            self.inner.insert_emotion(sample)
        }
        fn health_samples(&self, query: &SliceQuery) -> StoreResult<Vec<HealthSample>> {
            self.inner.health_samples(query)
        }
        fn heart_rate_samples(&self, query: &SliceQuery) -> StoreResult<Vec<HeartRateSample>> {
            self.inner.heart_rate_samples(query)
        }
        fn emotion_samples(&self, query: &SliceQuery) -> StoreResult<Vec<EmotionSample>> {
            self.inner.emotion_samples(query)
        }
        fn count(&self, table: Table, user_id: Option<&UserId>) -> StoreResult<usize> {
            self.inner.count(table, user_id)
        }
        fn distinct_user_ids(&self, table: Table) -> StoreResult<Vec<UserId>> {
            self.inner.distinct_user_ids(table)
        }
    }

    #[test]
    fn test_store_failure_is_internal_error() {
        let service =
            IntakeService::new(Arc::new(FlakyStore::failing_after(0)), IntakeConfig::default());
        let response = service.handle(IntakeRequest::HeartRateBatch(upload(json!({
            "type": "heart_rate_batch",
            "samples": [{"ts": 0, "bpm": 60}]
        }))));

        assert_eq!(response.status, StatusClass::InternalError);
        assert_eq!(
            response.body,
            json!({"error": "An unexpected server error occurred: store lock poisoned"})
        );
    }

    #[test]
    fn test_store_failure_keeps_earlier_records() {
        let store = Arc::new(FlakyStore::failing_after(2));
        let service = IntakeService::new(store.clone(), IntakeConfig::default());
        let response = service.handle(IntakeRequest::HeartRateBatch(upload(json!({
            "type": "heart_rate_batch",
            "samples": [
                {"ts": 0, "bpm": 60},
                {"ts": 1000, "bpm": 61},
                {"ts": 2000, "bpm": 62},
                {"ts": 3000, "bpm": 63}
            ]
        }))));

        assert_eq!(response.status, StatusClass::InternalError);
        assert_eq!(store.count(Table::HeartRate, None).unwrap(), 2);
        let values: Vec<f64> = store
            .heart_rate_samples(&all())
            .unwrap()
            .iter()
            .map(|s| s.value)
            .collect();
        assert_eq!(values, vec![60.0, 61.0]);
    }

    #[test]
    fn test_untyped_health_sample_stored_as_unknown() {
        let (service, store) = service();
        service
            .upload_health_batch(&upload(json!({
                "type": "health_data_batch",
                "samples": [{"ts": 0, "value": 60}, {"ts": 1000, "value": 61, "type": "steps"}]
            })))
            .unwrap();

        let types: Vec<String> = store
            .health_samples(&all())
            .unwrap()
            .into_iter()
            .map(|s| s.sample_type)
            .collect();
        assert_eq!(types, vec!["unknown", "steps"]);
    }

    #[test]
    fn test_non_string_types_do_not_skip_samples() {
        let (service, store) = service();
        let summary = service
            .upload_health_batch(&upload(json!({
                "type": "health_data_batch",
                "samples": [
                    {"ts": 0, "value": 60, "type": ["hr"]},
                    {"ts": 1000, "value": 61, "type": {"k": 1}}
                ]
            })))
            .unwrap();

        assert_eq!(summary.records_created(), 2);
        assert!(summary.skipped.is_empty());
        let types: Vec<String> = store
            .health_samples(&all())
            .unwrap()
            .into_iter()
            .map(|s| s.sample_type)
            .collect();
        assert_eq!(types, vec![r#"["hr"]"#, r#"{"k":1}"#]);

        let receipt = service
            .submit_emotion(br#"{"userid": "u1", "timestamp": 0, "valence": 1, "arousal": 1, "type": ["x"]}"#)
            .unwrap();
        assert_eq!(receipt.record.label, r#"["x"]"#);
    }

    #[test]
    fn test_handle_maps_outcomes() {
        let (service, _) = service();

        let response = service.handle(IntakeRequest::HealthBatch(upload(json!({
            "type": "health_data_batch",
            "samples": [{"ts": 0, "type": "hr", "value": 61}, {"ts": 1}]
        }))));
        assert_eq!(response.status, StatusClass::Created);
        assert_eq!(
            response.body,
            json!({"message": "Successfully processed 1 records.", "opportune": true})
        );

        let response = service.handle(IntakeRequest::EmotionBatch(upload(json!({
            "type": "emotion_batch",
            "samples": {}
        }))));
        assert_eq!(response.status, StatusClass::BadRequest);
        assert_eq!(
            response.body,
            json!({"error": "Invalid 'samples' format. It must be a list."})
        );
    }
}
