//! SQLite-backed sample store

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::DateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use super::{schema, SampleStore, SliceQuery, StoreResult};
use crate::error::StoreError;
use crate::types::{
    EmotionSample, HealthSample, HeartRateSample, Instant, NewEmotionSample, NewHealthSample,
    NewHeartRateSample, Table, UserId,
};

/// Store writing every sample to a local SQLite database
///
/// One connection behind a mutex; each insert is a single autocommit statement.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        schema::init_schema(&conn)?;
        debug!(path = %path.display(), "opened sample database");

        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }

    fn select<T>(
        &self,
        table: Table,
        columns: &str,
        query: &SliceQuery,
        map_row: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> StoreResult<Vec<T>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {columns} FROM {} WHERE (?1 IS NULL OR user_id = ?1) \
             ORDER BY id LIMIT ?2 OFFSET ?3",
            table.name()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                query.user_id.as_ref().map(UserId::as_str),
                to_sql_int(query.limit),
                to_sql_int(query.offset),
            ],
            map_row,
        )?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn to_sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn read_instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<Instant> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn read_user_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<UserId> {
    let raw: String = row.get(idx)?;
    UserId::new(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, "empty user id".into())
    })
}

impl SampleStore for SqliteStore {
    fn insert_health(&self, sample: NewHealthSample) -> StoreResult<HealthSample> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO health_samples (user_id, timestamp, sample_type, value) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                sample.user_id.as_str(),
                sample.timestamp.to_rfc3339(),
                sample.sample_type,
                sample.value,
            ],
        )?;
        Ok(sample.into_stored(conn.last_insert_rowid()))
    }

    fn insert_heart_rate(&self, sample: NewHeartRateSample) -> StoreResult<HeartRateSample> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO heart_rate_samples (user_id, timestamp, value) VALUES (?1, ?2, ?3)",
            params![
                sample.user_id.as_str(),
                sample.timestamp.to_rfc3339(),
                sample.value,
            ],
        )?;
        Ok(sample.into_stored(conn.last_insert_rowid()))
    }

    fn insert_emotion(&self, sample: NewEmotionSample) -> StoreResult<EmotionSample> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO emotion_samples (user_id, timestamp, valence, arousal, label) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sample.user_id.as_str(),
                sample.timestamp.to_rfc3339(),
                sample.valence,
                sample.arousal,
                sample.label,
            ],
        )?;
        Ok(sample.into_stored(conn.last_insert_rowid()))
    }

    fn health_samples(&self, query: &SliceQuery) -> StoreResult<Vec<HealthSample>> {
        self.select(
            Table::Health,
            "id, user_id, timestamp, sample_type, value",
            query,
            |row| {
                Ok(HealthSample {
                    id: row.get(0)?,
                    user_id: read_user_id(row, 1)?,
                    timestamp: read_instant(row, 2)?,
                    sample_type: row.get(3)?,
                    value: row.get(4)?,
                })
            },
        )
    }

    fn heart_rate_samples(&self, query: &SliceQuery) -> StoreResult<Vec<HeartRateSample>> {
        self.select(
            Table::HeartRate,
            "id, user_id, timestamp, value",
            query,
            |row| {
                Ok(HeartRateSample {
                    id: row.get(0)?,
                    user_id: read_user_id(row, 1)?,
                    timestamp: read_instant(row, 2)?,
                    value: row.get(3)?,
                })
            },
        )
    }

    fn emotion_samples(&self, query: &SliceQuery) -> StoreResult<Vec<EmotionSample>> {
        self.select(
            Table::Emotion,
            "id, user_id, timestamp, valence, arousal, label",
            query,
            |row| {
                Ok(EmotionSample {
                    id: row.get(0)?,
                    user_id: read_user_id(row, 1)?,
                    timestamp: read_instant(row, 2)?,
                    valence: row.get(3)?,
                    arousal: row.get(4)?,
                    label: row.get(5)?,
                })
            },
        )
    }

    fn count(&self, table: Table, user_id: Option<&UserId>) -> StoreResult<usize> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE (?1 IS NULL OR user_id = ?1)",
            table.name()
        );
        let count: i64 = conn.query_row(&sql, params![user_id.map(UserId::as_str)], |row| {
            row.get(0)
        })?;
        usize::try_from(count).map_err(|_| StoreError::CorruptRecord(format!("row count {count}")))
    }

    fn distinct_user_ids(&self, table: Table) -> StoreResult<Vec<UserId>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT DISTINCT user_id FROM {} ORDER BY user_id",
            table.name()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| read_user_id(row, 0))?;
        let ids = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::TimestampNormalizer;

    fn emotion(user: &str, iso: &str, valence: f64, arousal: f64) -> NewEmotionSample {
        NewEmotionSample {
            user_id: UserId::new(user).unwrap(),
            timestamp: TimestampNormalizer::default().from_iso(iso).unwrap(),
            valence,
            arousal,
            label: "periodic".to_string(),
        }
    }

    #[test]
    fn test_emotion_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stored = store
            .insert_emotion(emotion("u1", "2025-10-21T11:15:00Z", 3.0, 2.0))
            .unwrap();
        assert_eq!(stored.id, 1);

        let rows = store
            .emotion_samples(&SliceQuery {
                user_id: None,
                offset: 0,
                limit: 10,
            })
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id.as_str(), "u1");
        assert_eq!(rows[0].valence, 3.0);
        assert_eq!(rows[0].arousal, 2.0);
        assert_eq!(rows[0].timestamp.to_rfc3339(), "2025-10-21T16:45:00+05:30");
    }

    #[test]
    fn test_filter_count_and_users() {
        let store = SqliteStore::open_in_memory().unwrap();
        let normalizer = TimestampNormalizer::default();
        for (user, value) in [("b", 70.0), ("a", 71.0), ("b", 72.0)] {
            store
                .insert_health(NewHealthSample {
                    user_id: UserId::new(user).unwrap(),
                    timestamp: normalizer.from_epoch_millis(0.0).unwrap(),
                    sample_type: "hr".to_string(),
                    value,
                })
                .unwrap();
        }

        let only_b = store
            .health_samples(&SliceQuery {
                user_id: UserId::new("b"),
                offset: 0,
                limit: 10,
            })
            .unwrap();
        let ids: Vec<i64> = only_b.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);

        assert_eq!(store.count(Table::Health, None).unwrap(), 3);
        assert_eq!(store.count(Table::Health, UserId::new("a").as_ref()).unwrap(), 1);

        let users: Vec<String> = store
            .distinct_user_ids(Table::Health)
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(users, vec!["a", "b"]);
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("intake.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert_heart_rate(NewHeartRateSample {
                    user_id: UserId::new("7").unwrap(),
                    timestamp: TimestampNormalizer::default().from_epoch_millis(0.0).unwrap(),
                    value: 64.0,
                })
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.count(Table::HeartRate, None).unwrap(), 1);
        let rows = reopened
            .heart_rate_samples(&SliceQuery {
                user_id: None,
                offset: 0,
                limit: 1,
            })
            .unwrap();
        assert_eq!(rows[0].value, 64.0);
        assert_eq!(rows[0].timestamp.to_rfc3339(), "1970-01-01T05:30:00+05:30");
    }
}
