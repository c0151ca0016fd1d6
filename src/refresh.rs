//! Pulls the upstream country list and rate table, derives the GDP estimate and
//! replaces the stored country set.

use crate::core::country::NewCountry;
use crate::core::error::CountryError;
use crate::core::query::CountryQuery;
use crate::core::source::{CountrySource, RateSource, RateTable, UpstreamCountry};
use crate::core::store::CountryStore;
use crate::summary::SummaryImage;
use anyhow::Context;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Bounds of the per-country random GDP multiplier.
pub const GDP_MULTIPLIER_RANGE: RangeInclusive<u32> = 1000..=2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub total: usize,
    pub refreshed_at: DateTime<Utc>,
}

pub struct RefreshEngine {
    store: Arc<dyn CountryStore>,
    countries: Arc<dyn CountrySource>,
    rates: Arc<dyn RateSource>,
    summary: Arc<SummaryImage>,
    base_currency: String,
}

impl RefreshEngine {
    pub fn new(
        store: Arc<dyn CountryStore>,
        countries: Arc<dyn CountrySource>,
        rates: Arc<dyn RateSource>,
        summary: Arc<SummaryImage>,
        base_currency: &str,
    ) -> Self {
        RefreshEngine {
            store,
            countries,
            rates,
            summary,
            base_currency: base_currency.to_string(),
        }
    }

    /// Reloads the store and regenerates the summary image in the background.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CountryError> {
        let outcome = self.reload().await?;
        self.spawn_summary();
        Ok(outcome)
    }

    /// Fetches both upstreams and replaces every stored row. Nothing is written unless
    /// both fetches succeed.
    #[instrument(name = "RefreshCountries", skip(self), fields(base = %self.base_currency))]
    pub async fn reload(&self) -> Result<RefreshOutcome, CountryError> {
        let (countries, rates) = futures::join!(
            self.countries.fetch_countries(),
            self.rates.fetch_rates(&self.base_currency)
        );
        let countries = countries.map_err(|e| {
            error!("Country list fetch failed: {:#}", e);
            CountryError::UpstreamUnavailable(format!("Could not fetch country data: {e:#}"))
        })?;
        let rates = rates.map_err(|e| {
            error!("Exchange rate fetch failed: {:#}", e);
            CountryError::UpstreamUnavailable(format!("Could not fetch exchange rates: {e:#}"))
        })?;
        debug!(
            "Fetched {} countries and {} rates",
            countries.len(),
            rates.len()
        );

        let refreshed_at = Utc::now();
        let records: Vec<NewCountry> = {
            let mut rng = rand::thread_rng();
            countries
                .iter()
                .map(|entry| build_country(entry, &rates, refreshed_at, &mut rng))
                .collect()
        };

        let removed = self
            .store
            .delete_all()
            .await
            .context("Failed to clear countries before refresh")?;
        debug!("Removed {} stale countries", removed);

        for record in records.iter().cloned() {
            let name = record.name.clone();
            self.store
                .insert(record)
                .await
                .with_context(|| format!("Failed to store country {name}"))?;
        }

        info!("Refreshed {} countries", records.len());
        Ok(RefreshOutcome {
            total: records.len(),
            refreshed_at,
        })
    }

    /// Regenerates the summary image off the caller's path. The result is only logged.
    pub fn spawn_summary(&self) {
        let store = Arc::clone(&self.store);
        let summary = Arc::clone(&self.summary);
        tokio::spawn(async move {
            let countries = match store.find_all(&CountryQuery::default()).await {
                Ok(countries) => countries,
                Err(e) => {
                    error!("Summary image skipped, could not read countries: {:#}", e);
                    return;
                }
            };
            match summary.generate(&countries).await {
                Ok(Some(path)) => info!("Summary image written to {}", path.display()),
                Ok(None) => debug!("No countries, summary image not generated"),
                Err(e) => error!("Summary image generation failed: {:#}", e),
            }
        });
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Maps one upstream entry to a storable row stamped with `refreshed_at`.
pub fn build_country<R: Rng + ?Sized>(
    entry: &UpstreamCountry,
    rates: &RateTable,
    refreshed_at: DateTime<Utc>,
    rng: &mut R,
) -> NewCountry {
    let population = entry.population.unwrap_or(0);
    let currency_code = entry.primary_currency_code().map(str::to_string);
    let exchange_rate = currency_code
        .as_deref()
        .and_then(|code| rates.get(code).copied())
        .filter(|rate| rate.is_finite() && *rate > 0.0);
    let estimated_gdp = exchange_rate.map(|rate| {
        let multiplier = rng.gen_range(GDP_MULTIPLIER_RANGE);
        estimate_gdp(population, rate, multiplier)
    });

    NewCountry {
        name: non_blank(entry.name.as_deref()).unwrap_or_else(|| "N/A".to_string()),
        capital: non_blank(entry.capital.as_deref()),
        region: non_blank(entry.region.as_deref()).or_else(|| Some("Unknown".to_string())),
        population,
        currency_code,
        exchange_rate,
        estimated_gdp,
        flag_url: non_blank(entry.flag.as_deref()),
        last_refreshed_at: refreshed_at,
    }
}

/// `population * multiplier / rate`; zero population gives zero.
pub fn estimate_gdp(population: u64, rate: f64, multiplier: u32) -> f64 {
    if population == 0 {
        return 0.0;
    }
    population as f64 * f64::from(multiplier) / rate
}
