//! Sample persistence
//!
//! The intake pipeline only talks to [`SampleStore`]. Records are append-only:
//! the store assigns ids on insert and offers no update or delete path.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use schema::init_schema;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::types::{
    EmotionSample, HealthSample, HeartRateSample, NewEmotionSample, NewHealthSample,
    NewHeartRateSample, Table, UserId,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Window over a table in insertion order, optionally for one user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceQuery {
    pub user_id: Option<UserId>,
    pub offset: usize,
    pub limit: usize,
}

/// Append-only store for ingested samples
///
/// Implementations must tolerate concurrent callers; each insert is atomic on
/// its own, with no transaction spanning several records.
pub trait SampleStore: Send + Sync {
    fn insert_health(&self, sample: NewHealthSample) -> StoreResult<HealthSample>;

    fn insert_heart_rate(&self, sample: NewHeartRateSample) -> StoreResult<HeartRateSample>;

    fn insert_emotion(&self, sample: NewEmotionSample) -> StoreResult<EmotionSample>;

    /// Health samples ordered by id
    fn health_samples(&self, query: &SliceQuery) -> StoreResult<Vec<HealthSample>>;

    /// Heart-rate samples ordered by id
    fn heart_rate_samples(&self, query: &SliceQuery) -> StoreResult<Vec<HeartRateSample>>;

    /// Emotion samples ordered by id
    fn emotion_samples(&self, query: &SliceQuery) -> StoreResult<Vec<EmotionSample>>;

    /// Number of records in `table`, optionally for one user
    fn count(&self, table: Table, user_id: Option<&UserId>) -> StoreResult<usize>;

    /// Distinct user ids present in `table`, sorted
    fn distinct_user_ids(&self, table: Table) -> StoreResult<Vec<UserId>>;
}
