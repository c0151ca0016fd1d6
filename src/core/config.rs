use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::{fs, path::PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CountriesProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RatesProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_countries_provider")]
    pub countries: CountriesProviderConfig,
    #[serde(default = "default_rates_provider")]
    pub rates: RatesProviderConfig,
}

fn default_countries_provider() -> CountriesProviderConfig {
    CountriesProviderConfig {
        base_url: "https://restcountries.com".to_string(),
    }
}

fn default_rates_provider() -> RatesProviderConfig {
    RatesProviderConfig {
        base_url: "https://open.er-api.com".to_string(),
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            countries: default_countries_provider(),
            rates: default_rates_provider(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Disk,
    Memory,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_font_path() -> PathBuf {
    PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf")
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default)]
    pub storage: StorageKind,
    pub data_path: Option<String>,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            listen_addr: default_listen_addr(),
            storage: StorageKind::default(),
            data_path: None,
            cache_dir: default_cache_dir(),
            font_path: default_font_path(),
            base_currency: default_base_currency(),
            request_timeout_secs: default_request_timeout_secs(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file, or the built-in defaults when there is none.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default().with_env_overrides());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "ctry", "ctry")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "ctry", "ctry")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config.with_env_overrides())
    }

    /// `PORT` replaces the port of `listen_addr`.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("PORT") {
            self.apply_port_override(&port);
        }
        self
    }

    fn apply_port_override(&mut self, value: &str) {
        match value.trim().parse::<u16>() {
            Ok(port) => {
                debug!("Using port {} from PORT", port);
                self.listen_addr.set_port(port);
            }
            Err(e) => warn!(
                "Ignoring invalid PORT {:?}, keeping {}: {}",
                value, self.listen_addr, e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
listen_addr: "127.0.0.1:8080"
storage: memory
cache_dir: "/tmp/ctry-cache"
base_currency: "EUR"
providers:
  countries:
    base_url: "http://example.com/countries"
  rates:
    base_url: "http://example.com/rates"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/ctry-cache"));
        assert_eq!(config.base_currency, "EUR");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(
            config.providers.countries.base_url,
            "http://example.com/countries"
        );
        assert_eq!(config.providers.rates.base_url, "http://example.com/rates");
    }

    #[test]
    fn test_config_defaults_for_missing_fields() {
        let config: AppConfig = serde_yaml::from_str("data_path: /tmp/ctry").unwrap();
        assert_eq!(config.storage, StorageKind::Disk);
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(
            config.providers.countries.base_url,
            "https://restcountries.com"
        );
        assert_eq!(config.providers.rates.base_url, "https://open.er-api.com");
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/ctry")
        );
    }

    #[test]
    fn test_port_override() {
        let mut config = AppConfig::default();
        config.apply_port_override("8080");
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());

        config.apply_port_override("not-a-port");
        assert_eq!(config.listen_addr.port(), 8080);
        config.apply_port_override("70000");
        assert_eq!(config.listen_addr.port(), 8080);
    }

    #[test]
    fn test_partial_providers_section() {
        let yaml_str = r#"
providers:
  rates:
    base_url: "http://localhost:9000"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(config.providers.rates.base_url, "http://localhost:9000");
        assert_eq!(
            config.providers.countries.base_url,
            "https://restcountries.com"
        );
    }
}
