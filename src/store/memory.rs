//! In-process store, used by tests and ephemeral runs

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use super::{SampleStore, SliceQuery, StoreResult};
use crate::error::StoreError;
use crate::types::{
    EmotionSample, HealthSample, HeartRateSample, NewEmotionSample, NewHealthSample,
    NewHeartRateSample, RecordId, Table, UserId,
};

/// Store keeping every table in a `Vec` behind one lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    health: Vec<HealthSample>,
    heart_rate: Vec<HeartRateSample>,
    emotion: Vec<EmotionSample>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Ids start at 1 and follow insertion order, as with an autoincrement key
fn next_id(len: usize) -> RecordId {
    len as RecordId + 1
}

fn slice<T: Clone>(
    rows: &[T],
    query: &SliceQuery,
    user_of: impl Fn(&T) -> &UserId,
) -> Vec<T> {
    rows.iter()
        .filter(|row| query.user_id.as_ref().map_or(true, |id| user_of(*row) == id))
        .skip(query.offset)
        .take(query.limit)
        .cloned()
        .collect()
}

impl SampleStore for MemoryStore {
    fn insert_health(&self, sample: NewHealthSample) -> StoreResult<HealthSample> {
        let mut tables = self.lock()?;
        let stored = sample.into_stored(next_id(tables.health.len()));
        tables.health.push(stored.clone());
        Ok(stored)
    }

    fn insert_heart_rate(&self, sample: NewHeartRateSample) -> StoreResult<HeartRateSample> {
        let mut tables = self.lock()?;
        let stored = sample.into_stored(next_id(tables.heart_rate.len()));
        tables.heart_rate.push(stored.clone());
        Ok(stored)
    }

    fn insert_emotion(&self, sample: NewEmotionSample) -> StoreResult<EmotionSample> {
        let mut tables = self.lock()?;
        let stored = sample.into_stored(next_id(tables.emotion.len()));
        tables.emotion.push(stored.clone());
        Ok(stored)
    }

    fn health_samples(&self, query: &SliceQuery) -> StoreResult<Vec<HealthSample>> {
        Ok(slice(&self.lock()?.health, query, |s| &s.user_id))
    }

    fn heart_rate_samples(&self, query: &SliceQuery) -> StoreResult<Vec<HeartRateSample>> {
        Ok(slice(&self.lock()?.heart_rate, query, |s| &s.user_id))
    }

    fn emotion_samples(&self, query: &SliceQuery) -> StoreResult<Vec<EmotionSample>> {
        Ok(slice(&self.lock()?.emotion, query, |s| &s.user_id))
    }

    fn count(&self, table: Table, user_id: Option<&UserId>) -> StoreResult<usize> {
        let tables = self.lock()?;
        let users = tables.users(table);
        Ok(users
            .iter()
            .filter(|u| user_id.map_or(true, |id| **u == id))
            .count())
    }

    fn distinct_user_ids(&self, table: Table) -> StoreResult<Vec<UserId>> {
        let tables = self.lock()?;
        let unique: BTreeSet<&UserId> = tables.users(table).into_iter().collect();
        Ok(unique.into_iter().cloned().collect())
    }
}

impl Tables {
    fn users(&self, table: Table) -> Vec<&UserId> {
        match table {
            Table::Health => self.health.iter().map(|s| &s.user_id).collect(),
            Table::HeartRate => self.heart_rate.iter().map(|s| &s.user_id).collect(),
            Table::Emotion => self.emotion.iter().map(|s| &s.user_id).collect(),
        }
    }
}
