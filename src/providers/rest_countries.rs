use crate::core::source::{CountrySource, UpstreamCountry};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, instrument};

const FIELDS: &str = "name,capital,region,population,flag,currencies";

/// Country list from the REST Countries v2 API.
pub struct RestCountriesProvider {
    base_url: String,
    timeout: Duration,
}

impl RestCountriesProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        RestCountriesProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl CountrySource for RestCountriesProvider {
    #[instrument(name = "RestCountriesFetch", skip(self))]
    async fn fetch_countries(&self) -> Result<Vec<UpstreamCountry>> {
        let url = format!("{}/v2/all?fields={}", self.base_url, FIELDS);
        debug!("Requesting country list from {}", url);

        let client = reqwest::Client::builder()
            .user_agent(concat!("ctry/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for country list URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for country list",
                response.status()
            ));
        }

        let text = response.text().await?;
        let countries: Vec<UpstreamCountry> = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(e) => {
                error!(error = ?e, "Failed to parse country list response");
                return Err(anyhow!("Failed to parse JSON response for country list: {}", e));
            }
        };

        if countries.is_empty() {
            return Err(anyhow!("No country data returned"));
        }
        debug!("Received {} countries", countries.len());
        Ok(countries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/all"))
            .and(query_param("fields", FIELDS))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &MockServer) -> RestCountriesProvider {
        RestCountriesProvider::new(&server.uri(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_successful_country_fetch() {
        let mock_response = r#"[
            {
                "name": "Ghana",
                "capital": "Accra",
                "region": "Africa",
                "population": 31072940,
                "flag": "https://flagcdn.com/gh.svg",
                "currencies": [{"code": "GHS", "name": "Ghanaian cedi", "symbol": "₵"}],
                "independent": false
            },
            {"name": "Bouvet Island", "region": "Antarctic", "population": 0}
        ]"#;
        let mock_server = create_mock_server(200, mock_response).await;

        let countries = provider(&mock_server).fetch_countries().await.unwrap();
        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0].name.as_deref(), Some("Ghana"));
        assert_eq!(countries[0].primary_currency_code(), Some("GHS"));
        assert_eq!(countries[1].population, Some(0));
        assert!(countries[1].currencies.is_none());
    }

    #[tokio::test]
    async fn test_empty_country_list_is_an_error() {
        let mock_server = create_mock_server(200, "[]").await;
        let result = provider(&mock_server).fetch_countries().await;
        assert_eq!(result.unwrap_err().to_string(), "No country data returned");
    }

    #[tokio::test]
    async fn test_country_api_error_response() {
        let mock_server = create_mock_server(500, "").await;
        let result = provider(&mock_server).fetch_countries().await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for country list"
        );
    }

    #[tokio::test]
    async fn test_country_api_malformed_response() {
        let mock_server = create_mock_server(200, r#"{"status": 404}"#).await;
        let result = provider(&mock_server).fetch_countries().await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for country list")
        );
    }
}
