//! Record store abstraction for country rows.

use crate::core::country::{Country, NewCountry};
use crate::core::query::CountryQuery;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable table of countries. Every call is atomic on its own; nothing spans calls.
#[async_trait]
pub trait CountryStore: Send + Sync {
    /// Stores a new row and returns it with its assigned id.
    async fn insert(&self, country: NewCountry) -> Result<Country>;

    async fn delete_all(&self) -> Result<usize>;

    /// Removes every row whose name matches case-insensitively.
    async fn delete_by_name(&self, name: &str) -> Result<usize>;

    async fn find_all(&self, query: &CountryQuery) -> Result<Vec<Country>>;

    /// First case-insensitive match in id order.
    async fn find_by_name(&self, name: &str) -> Result<Option<Country>>;

    async fn count(&self) -> Result<usize>;

    /// Latest `last_refreshed_at` across all rows.
    async fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>>;
}
