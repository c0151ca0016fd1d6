use crate::core::country::{Country, NewCountry};
use crate::core::query::CountryQuery;
use crate::core::store::CountryStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

struct MemoryTable {
    next_id: u64,
    rows: BTreeMap<u64, Country>,
}

/// Volatile country table backed by a BTreeMap keyed by id.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryTable {
                next_id: 1,
                rows: BTreeMap::new(),
            })),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CountryStore for MemoryStore {
    async fn insert(&self, country: NewCountry) -> Result<Country> {
        let mut table = self.inner.lock().await;
        let id = table.next_id;
        table.next_id += 1;
        let row = country.with_id(id);
        table.rows.insert(id, row.clone());
        debug!("Store INSERT id={}", id);
        Ok(row)
    }

    async fn delete_all(&self) -> Result<usize> {
        let mut table = self.inner.lock().await;
        let removed = table.rows.len();
        table.rows.clear();
        debug!("Store CLEAR removed={}", removed);
        Ok(removed)
    }

    async fn delete_by_name(&self, name: &str) -> Result<usize> {
        let mut table = self.inner.lock().await;
        let before = table.rows.len();
        table.rows.retain(|_, row| !row.name_matches(name));
        let removed = before - table.rows.len();
        debug!("Store DELETE name={:?} removed={}", name, removed);
        Ok(removed)
    }

    async fn find_all(&self, query: &CountryQuery) -> Result<Vec<Country>> {
        let table = self.inner.lock().await;
        Ok(query.apply(table.rows.values().cloned()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Country>> {
        let table = self.inner.lock().await;
        Ok(table.rows.values().find(|row| row.name_matches(name)).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.lock().await.rows.len())
    }

    async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>> {
        let table = self.inner.lock().await;
        Ok(table.rows.values().map(|row| row.last_refreshed_at).max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_country(name: &str, refreshed_at: DateTime<Utc>) -> NewCountry {
        NewCountry {
            name: name.to_string(),
            capital: None,
            region: Some("Europe".to_string()),
            population: 10,
            currency_code: None,
            exchange_rate: None,
            estimated_gdp: None,
            flag_url: None,
            last_refreshed_at: refreshed_at,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let a = store.insert(new_country("Spain", now)).await.unwrap();
        let b = store.insert(new_country("Portugal", now)).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.count().await.unwrap(), 2);

        // Ids are not reused after clearing
        assert_eq!(store.delete_all().await.unwrap(), 2);
        let c = store.insert(new_country("Italy", now)).await.unwrap();
        assert_eq!(c.id, 3);
    }

    #[tokio::test]
    async fn test_name_lookup_and_delete_ignore_case() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert(new_country("Japan", now)).await.unwrap();
        store.insert(new_country("Chile", now)).await.unwrap();

        let found = store.find_by_name("JAPAN").await.unwrap().unwrap();
        assert_eq!(found.name, "Japan");
        assert!(store.find_by_name("Japa").await.unwrap().is_none());

        assert_eq!(store.delete_by_name("missing").await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.delete_by_name("japan").await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_name_returns_first_duplicate() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = store.insert(new_country("Congo", now)).await.unwrap();
        store.insert(new_country("congo", now)).await.unwrap();

        let found = store.find_by_name("CONGO").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(store.delete_by_name("Congo").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_last_refreshed_at_is_max() {
        let store = MemoryStore::new();
        assert!(store.last_refreshed_at().await.unwrap().is_none());

        let older = Utc::now() - Duration::hours(1);
        let newer = Utc::now();
        store.insert(new_country("A", newer)).await.unwrap();
        store.insert(new_country("B", older)).await.unwrap();
        assert_eq!(store.last_refreshed_at().await.unwrap(), Some(newer));
    }
}
