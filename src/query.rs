//! Paginated read-back of persisted samples
//!
//! Page numbers arrive as untrusted text. Resolution is lenient: anything that
//! is not an integer yields the first page, and a number below 1 or past the end
//! yields the last page. An empty table still has one (empty) page.

use std::sync::Arc;

use serde::Serialize;

use crate::store::{SampleStore, SliceQuery, StoreResult};
use crate::types::{EmotionSample, HealthSample, HeartRateSample, Table, UserId};

/// One page of records plus table-level context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served
    pub number: usize,
    pub num_pages: usize,
    pub page_size: usize,
    /// Records matching the filter
    pub total_records: usize,
    /// Sorted distinct user ids of the whole table
    pub unique_user_ids: Vec<UserId>,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Resolve a requested page number against the number of pages
pub fn resolve_page(requested: Option<&str>, num_pages: usize) -> usize {
    let last = num_pages.max(1);
    match requested.map(|raw| raw.trim().parse::<i64>()) {
        None | Some(Err(_)) => 1,
        Some(Ok(n)) if n < 1 => last,
        Some(Ok(n)) => usize::try_from(n).map_or(last, |n| n.min(last)),
    }
}

/// Number of pages needed for `total` records
pub fn page_count(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total.div_ceil(page_size).max(1)
}

/// Read-only view over a [`SampleStore`]
pub struct ReadModel {
    store: Arc<dyn SampleStore>,
    page_size: usize,
}

impl ReadModel {
    pub fn new(store: Arc<dyn SampleStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    pub fn health_page(
        &self,
        requested: Option<&str>,
        user_id: Option<&UserId>,
    ) -> StoreResult<Page<HealthSample>> {
        self.page(Table::Health, requested, user_id, |query| {
            self.store.health_samples(query)
        })
    }

    pub fn heart_rate_page(
        &self,
        requested: Option<&str>,
        user_id: Option<&UserId>,
    ) -> StoreResult<Page<HeartRateSample>> {
        self.page(Table::HeartRate, requested, user_id, |query| {
            self.store.heart_rate_samples(query)
        })
    }

    pub fn emotion_page(
        &self,
        requested: Option<&str>,
        user_id: Option<&UserId>,
    ) -> StoreResult<Page<EmotionSample>> {
        self.page(Table::Emotion, requested, user_id, |query| {
            self.store.emotion_samples(query)
        })
    }

    fn page<T>(
        &self,
        table: Table,
        requested: Option<&str>,
        user_id: Option<&UserId>,
        fetch: impl FnOnce(&SliceQuery) -> StoreResult<Vec<T>>,
    ) -> StoreResult<Page<T>> {
        let total_records = self.store.count(table, user_id)?;
        let num_pages = page_count(total_records, self.page_size);
        let number = resolve_page(requested, num_pages);

        let items = fetch(&SliceQuery {
            user_id: user_id.cloned(),
            offset: (number - 1) * self.page_size,
            limit: self.page_size,
        })?;

        Ok(Page {
            items,
            number,
            num_pages,
            page_size: self.page_size,
            total_records,
            unique_user_ids: self.store.distinct_user_ids(table)?,
            has_next: number < num_pages,
            has_previous: number > 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::timestamp::TimestampNormalizer;
    use crate::types::NewHeartRateSample;
    use pretty_assertions::assert_eq;

    fn seeded(count: usize) -> ReadModel {
        let store = Arc::new(MemoryStore::new());
        let normalizer = TimestampNormalizer::default();
        for i in 0..count {
            let user = if i % 2 == 0 { "even" } else { "odd" };
            store
                .insert_heart_rate(NewHeartRateSample {
                    user_id: UserId::new(user).unwrap(),
                    timestamp: normalizer.from_epoch_millis(i as f64 * 1000.0).unwrap(),
                    value: 60.0 + i as f64,
                })
                .unwrap();
        }
        ReadModel::new(store, 15)
    }

    #[test]
    fn test_resolve_page() {
        assert_eq!(resolve_page(None, 3), 1);
        assert_eq!(resolve_page(Some("abc"), 3), 1);
        assert_eq!(resolve_page(Some("2"), 3), 2);
        assert_eq!(resolve_page(Some("0"), 3), 3);
        assert_eq!(resolve_page(Some("-4"), 3), 3);
        assert_eq!(resolve_page(Some("99"), 3), 3);
        assert_eq!(resolve_page(Some("5"), 0), 1);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 15), 1);
        assert_eq!(page_count(15, 15), 1);
        assert_eq!(page_count(16, 15), 2);
    }

    #[test]
    fn test_pages_in_id_order() {
        let model = seeded(32);

        let first = model.heart_rate_page(None, None).unwrap();
        assert_eq!(first.items.len(), 15);
        assert_eq!(first.items[0].id, 1);
        assert_eq!(first.num_pages, 3);
        assert_eq!(first.total_records, 32);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let last = model.heart_rate_page(Some("1000"), None).unwrap();
        assert_eq!(last.number, 3);
        let ids: Vec<i64> = last.items.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![31, 32]);
        assert!(!last.has_next);
        assert!(last.has_previous);
    }

    #[test]
    fn test_user_filter() {
        let model = seeded(5);
        let odd = UserId::new("odd").unwrap();
        let page = model.heart_rate_page(Some("1"), Some(&odd)).unwrap();

        assert_eq!(page.total_records, 2);
        assert!(page.items.iter().all(|s| s.user_id == odd));
        let users: Vec<&str> = page.unique_user_ids.iter().map(UserId::as_str).collect();
        assert_eq!(users, vec!["even", "odd"]);
    }

    #[test]
    fn test_empty_table_has_one_page() {
        let model = seeded(0);
        let page = model.emotion_page(Some("3"), None).unwrap();
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }
}
