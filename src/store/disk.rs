use crate::core::country::{Country, NewCountry};
use crate::core::query::CountryQuery;
use crate::core::store::CountryStore;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

const PARTITION: &str = "countries";
const META_PARTITION: &str = "meta";
const NEXT_ID_KEY: &str = "next_id";

/// Durable country table in a fjall partition. Keys are big-endian ids so a scan
/// yields rows in id order; values are JSON-encoded rows.
///
/// The next id lives in a `meta` partition and only ever grows, so ids freed by
/// deletes are not handed out again after a reopen.
pub struct DiskStore {
    keyspace: Keyspace,
    rows: PartitionHandle,
    meta: PartitionHandle,
    next_id: Mutex<u64>,
}

impl DiskStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(db_path)
            .with_context(|| format!("Failed to create directory: {}", db_path.display()))?;

        let keyspace = Config::new(db_path)
            .open()
            .with_context(|| format!("Failed to open keyspace at {}", db_path.display()))?;
        let rows = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        let meta = keyspace.open_partition(META_PARTITION, PartitionCreateOptions::default())?;

        let stored_next = match meta.get(NEXT_ID_KEY)? {
            Some(value) => decode_id(&value)?,
            None => 1,
        };
        let after_last_row = match rows.last_key_value()? {
            Some((key, _)) => decode_id(&key)? + 1,
            None => 1,
        };
        let next_id = stored_next.max(after_last_row);
        debug!("Opened country store at {} (next id {})", db_path.display(), next_id);

        Ok(Self {
            keyspace,
            rows,
            meta,
            next_id: Mutex::new(next_id),
        })
    }

    fn scan(&self) -> Result<Vec<Country>> {
        self.rows
            .iter()
            .map(|item| {
                let (key, value) = item?;
                serde_json::from_slice(&value)
                    .with_context(|| format!("Corrupt country row {}", decode_id(&key).unwrap_or(0)))
            })
            .collect()
    }

    fn remove_where(&self, predicate: impl Fn(&Country) -> bool) -> Result<usize> {
        let doomed: Vec<u64> = self
            .scan()?
            .into_iter()
            .filter(|row| predicate(row))
            .map(|row| row.id)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let mut batch = self.keyspace.batch();
        for id in &doomed {
            batch.remove(&self.rows, encode_id(*id));
        }
        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(doomed.len())
    }
}

fn encode_id(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

fn decode_id(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| anyhow!("Malformed row key of length {}", key.len()))?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl CountryStore for DiskStore {
    async fn insert(&self, country: NewCountry) -> Result<Country> {
        let mut next_id = self
            .next_id
            .lock()
            .map_err(|_| anyhow!("Id counter lock poisoned"))?;
        let id = *next_id;
        let row = country.with_id(id);

        let mut batch = self.keyspace.batch();
        batch.insert(&self.rows, encode_id(id), serde_json::to_vec(&row)?);
        batch.insert(&self.meta, NEXT_ID_KEY, encode_id(id + 1));
        batch.commit()?;
        self.keyspace.persist(PersistMode::Buffer)?;
        *next_id = id + 1;
        debug!("Store INSERT id={}", id);
        Ok(row)
    }

    async fn delete_all(&self) -> Result<usize> {
        let removed = self.remove_where(|_| true)?;
        debug!("Store CLEAR removed={}", removed);
        Ok(removed)
    }

    async fn delete_by_name(&self, name: &str) -> Result<usize> {
        let removed = self.remove_where(|row| row.name_matches(name))?;
        debug!("Store DELETE name={:?} removed={}", name, removed);
        Ok(removed)
    }

    async fn find_all(&self, query: &CountryQuery) -> Result<Vec<Country>> {
        Ok(query.apply(self.scan()?))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Country>> {
        Ok(self.scan()?.into_iter().find(|row| row.name_matches(name)))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rows.len()?)
    }

    async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.scan()?.into_iter().map(|row| row.last_refreshed_at).max())
    }
}
