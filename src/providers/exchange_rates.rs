use crate::core::source::{RateSource, RateTable};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Latest rates from the open.er-api.com v6 API.
pub struct ExchangeRateProvider {
    base_url: String,
    timeout: Duration,
}

impl ExchangeRateProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        ExchangeRateProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    rates: Option<RateTable>,
}

#[async_trait]
impl RateSource for ExchangeRateProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str) -> Result<RateTable> {
        let url = format!("{}/v6/latest/{}", self.base_url, base);
        debug!("Requesting exchange rates from {}", url);

        let client = reqwest::Client::builder()
            .user_agent(concat!("ctry/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for exchange rates base: {}", e, base))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for exchange rates base: {}",
                response.status(),
                base
            ));
        }

        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for rates {}: {}", base, e))?;

        if data.result.as_deref() == Some("error") {
            return Err(anyhow!(
                "Exchange rate API error: {}",
                data.error_type.as_deref().unwrap_or("unknown")
            ));
        }

        let rates = data
            .rates
            .filter(|rates| !rates.is_empty())
            .ok_or_else(|| anyhow!("No exchange rates returned for base: {}", base))?;
        debug!("Received {} exchange rates", rates.len());
        Ok(rates)
    }
}
