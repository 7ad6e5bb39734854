//! Vitals Intake - ingestion and validation pipeline for wearable samples
//!
//! Intake turns untrusted JSON uploads from client devices into typed,
//! persisted records through a deterministic pipeline: envelope validation →
//! per-sample parsing (coercion, range checks, timestamp normalization) →
//! persistence → response summary.
//!
//! ## Entry points
//!
//! - **Batch uploads**: health, heart-rate and emotion batches with per-sample
//!   soft-skip
//! - **Single emotion submission**: whole-request validation
//! - **Read model**: paginated read-back of stored samples

pub mod coerce;
pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod parser;
pub mod query;
pub mod response;
pub mod service;
pub mod store;
pub mod timestamp;
pub mod types;

pub use config::IntakeConfig;
pub use error::{IngestError, SampleRejection, StatusClass};
pub use query::{Page, ReadModel};
pub use response::IntakeResponse;
pub use service::{BatchSummary, BatchUpload, EmotionReceipt, IntakeRequest, IntakeService};
pub use store::{MemoryStore, SampleStore, SqliteStore};

/// Crate version reported by hosts
pub const INTAKE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by hosts
pub const PRODUCER_NAME: &str = "vitals-intake";
