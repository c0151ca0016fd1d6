//! Upstream data abstractions: the country list and the exchange-rate table.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// Exchange rates keyed by currency code, relative to a base currency (base = 1.0).
pub type RateTable = HashMap<String, f64>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamCurrency {
    pub code: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

/// One entry of the upstream country list. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamCountry {
    pub name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: Option<u64>,
    pub flag: Option<String>,
    pub currencies: Option<Vec<UpstreamCurrency>>,
}

impl UpstreamCountry {
    /// Code of the first listed currency, if it has a non-blank one.
    pub fn primary_currency_code(&self) -> Option<&str> {
        self.currencies
            .as_ref()
            .and_then(|currencies| currencies.first())
            .and_then(|currency| currency.code.as_deref())
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

#[async_trait]
pub trait CountrySource: Send + Sync {
    async fn fetch_countries(&self) -> Result<Vec<UpstreamCountry>>;
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> Result<RateTable>;
}
