use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use ctry::api::app_router;
use ctry::core::config::{AppConfig, StorageKind};
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;
use tracing::info;

const TEST_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const COUNTRIES: &str = r#"[
        {"name": "Germany", "capital": "Berlin", "region": "Europe", "population": 83240525,
         "flag": "https://flagcdn.com/de.svg", "currencies": [{"code": "EUR"}]},
        {"name": "France", "capital": "Paris", "region": "Europe", "population": 67391582,
         "flag": "https://flagcdn.com/fr.svg", "currencies": [{"code": "EUR"}]},
        {"name": "Japan", "capital": "Tokyo", "region": "Asia", "population": 125836021,
         "flag": "https://flagcdn.com/jp.svg", "currencies": [{"code": "JPY"}]},
        {"name": "Switzerland", "capital": "Bern", "region": "Europe", "population": 8654622,
         "currencies": [{"code": "CHF"}]},
        {"name": "Bouvet Island", "region": "Antarctic", "population": 0,
         "currencies": [{"code": "NOK"}]},
        {"name": "Antarctica", "region": "Polar", "population": 1000}
    ]"#;

    pub const RATES: &str = r#"{
        "result": "success",
        "base_code": "USD",
        "rates": {"USD": 1, "EUR": 0.92, "JPY": 150.2, "NOK": 10.7}
    }"#;

    pub async fn create_countries_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/all"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    pub async fn create_rates_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/latest/USD"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }
}

struct TestApp {
    router: Router,
    _cache: TempDir,
}

fn test_config(countries_url: &str, rates_url: &str, cache_dir: &Path) -> AppConfig {
    let mut config = AppConfig {
        storage: StorageKind::Memory,
        cache_dir: cache_dir.to_path_buf(),
        font_path: TEST_FONT.into(),
        request_timeout_secs: 5,
        ..AppConfig::default()
    };
    config.providers.countries.base_url = countries_url.to_string();
    config.providers.rates.base_url = rates_url.to_string();
    config
}

async fn app_with(countries: (u16, &str), rates: (u16, &str)) -> (TestApp, [wiremock::MockServer; 2]) {
    let countries_server = test_utils::create_countries_server(countries.0, countries.1).await;
    let rates_server = test_utils::create_rates_server(rates.0, rates.1).await;
    let cache = TempDir::new().unwrap();
    let config = test_config(&countries_server.uri(), &rates_server.uri(), cache.path());
    let state = ctry::build_state(&config).unwrap();
    let app = TestApp {
        router: app_router(state),
        _cache: cache,
    };
    (app, [countries_server, rates_server])
}

async fn send(app: &TestApp, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &TestApp, method: Method, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, method, uri).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn refresh(app: &TestApp) -> Value {
    let (status, body) = send_json(app, Method::POST, "/countries/refresh").await;
    assert_eq!(status, StatusCode::OK, "refresh failed: {body}");
    body
}

#[test_log::test(tokio::test)]
async fn test_root_is_alive() {
    let (app, _servers) = app_with((200, test_utils::COUNTRIES), (200, test_utils::RATES)).await;
    let (status, body) = send(&app, Method::GET, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Country API is running");
}

#[test_log::test(tokio::test)]
async fn test_refresh_then_status() {
    let (app, _servers) = app_with((200, test_utils::COUNTRIES), (200, test_utils::RATES)).await;

    let (status, before) = send_json(&app, Method::GET, "/countries/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["total_countries"], 0);
    assert_eq!(before["last_refreshed_at"], "Not refreshed yet");

    let body = refresh(&app).await;
    assert_eq!(body["message"], "Countries refreshed successfully");
    assert_eq!(body["total"], 6);

    // A second refresh replaces rather than appends
    refresh(&app).await;

    let (_, after) = send_json(&app, Method::GET, "/countries/status").await;
    info!(?after, "Status after refresh");
    assert_eq!(after["status"], "ok");
    assert_eq!(after["total_countries"], 6);

    let (_, list) = send_json(&app, Method::GET, "/countries").await;
    let rows = list.as_array().unwrap();
    assert_eq!(rows.len(), 6);
    assert!(
        rows.iter()
            .all(|c| c["last_refreshed_at"] == after["last_refreshed_at"])
    );
}

#[test_log::test(tokio::test)]
async fn test_derived_fields() {
    let (app, _servers) = app_with((200, test_utils::COUNTRIES), (200, test_utils::RATES)).await;
    refresh(&app).await;

    let (_, japan) = send_json(&app, Method::GET, "/countries/Japan").await;
    let population = japan["population"].as_f64().unwrap();
    let rate = japan["exchange_rate"].as_f64().unwrap();
    let gdp = japan["estimated_gdp"].as_f64().unwrap();
    assert_eq!(rate, 150.2);
    assert!(gdp >= population * 1000.0 / rate - 1e-6);
    assert!(gdp <= population * 2000.0 / rate + 1e-6);

    let (_, bouvet) = send_json(&app, Method::GET, "/countries/bouvet%20island").await;
    assert_eq!(bouvet["estimated_gdp"], 0.0);

    let (_, swiss) = send_json(&app, Method::GET, "/countries/switzerland").await;
    assert_eq!(swiss["currency_code"], "CHF");
    assert!(swiss["exchange_rate"].is_null());
    assert!(swiss["estimated_gdp"].is_null());

    let (_, polar) = send_json(&app, Method::GET, "/countries/antarctica").await;
    assert!(polar["currency_code"].is_null());
    assert!(polar["estimated_gdp"].is_null());
}

#[test_log::test(tokio::test)]
async fn test_lookup_and_delete_ignore_case() {
    let (app, _servers) = app_with((200, test_utils::COUNTRIES), (200, test_utils::RATES)).await;
    refresh(&app).await;

    let (status, lower) = send_json(&app, Method::GET, "/countries/japan").await;
    assert_eq!(status, StatusCode::OK);
    let (_, upper) = send_json(&app, Method::GET, "/countries/JAPAN").await;
    assert_eq!(lower, upper);

    let (status, body) = send_json(&app, Method::GET, "/countries/Narnia").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Country not found");

    let (status, _) = send_json(&app, Method::DELETE, "/countries/Narnia").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, status_body) = send_json(&app, Method::GET, "/countries/status").await;
    assert_eq!(status_body["total_countries"], 6);

    let (status, body) = send_json(&app, Method::DELETE, "/countries/fRANCE").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Country deleted successfully");
    let (status, _) = send_json(&app, Method::GET, "/countries/France").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, status_body) = send_json(&app, Method::GET, "/countries/status").await;
    assert_eq!(status_body["total_countries"], 5);
}

#[test_log::test(tokio::test)]
async fn test_list_filters_and_sorting() {
    let (app, _servers) = app_with((200, test_utils::COUNTRIES), (200, test_utils::RATES)).await;
    refresh(&app).await;

    let (_, body) = send_json(&app, Method::GET, "/countries?region=Europe&currency=EUR").await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["France", "Germany"]);

    let (_, body) = send_json(&app, Method::GET, "/countries?sort=gdp_desc").await;
    let gdps: Vec<Option<f64>> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["estimated_gdp"].as_f64())
        .collect();
    let present: Vec<f64> = gdps.iter().flatten().copied().collect();
    assert!(present.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(&gdps[present.len()..], &[None, None]);

    let (_, body) = send_json(&app, Method::GET, "/countries?sort=population_desc&region=").await;
    let first = &body.as_array().unwrap()[0];
    assert_eq!(first["name"], "Japan");

    let (status, body) = send_json(&app, Method::GET, "/countries?sort=colour_desc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("colour"));
}

#[test_log::test(tokio::test)]
async fn test_upstream_failure_leaves_store_untouched() {
    let (app, _servers) = app_with((200, test_utils::COUNTRIES), (500, "")).await;

    let (status, body) = send_json(&app, Method::POST, "/countries/refresh").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "External data source unavailable");
    assert!(body["details"].as_str().unwrap().contains("exchange rates"));

    let (_, status_body) = send_json(&app, Method::GET, "/countries/status").await;
    assert_eq!(status_body["total_countries"], 0);

    let (app, _servers) = app_with((200, "[]"), (200, test_utils::RATES)).await;
    let (status, _) = send_json(&app, Method::POST, "/countries/refresh").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[test_log::test(tokio::test)]
async fn test_summary_image() {
    let (app, _servers) = app_with((200, test_utils::COUNTRIES), (200, test_utils::RATES)).await;

    let (status, body) = send_json(&app, Method::GET, "/countries/image").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"],
        "No countries found. Run /countries/refresh first."
    );

    if !Path::new(TEST_FONT).exists() {
        info!("Skipping image rendering, font {TEST_FONT} not available");
        return;
    }

    refresh(&app).await;
    let (status, png) = send(&app, Method::GET, "/countries/image").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}
