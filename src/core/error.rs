use thiserror::Error;

/// Failure taxonomy shared by the refresh engine and the HTTP layer.
#[derive(Error, Debug)]
pub enum CountryError {
    /// Either upstream call failed or returned nothing usable. No writes were made.
    #[error("External data source unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Country not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
