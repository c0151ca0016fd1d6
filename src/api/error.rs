use crate::core::error::CountryError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("External data source unavailable")]
    Upstream(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("Failed to generate summary image")]
    Image(#[source] anyhow::Error),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<CountryError> for ApiError {
    fn from(err: CountryError) -> Self {
        match err {
            CountryError::UpstreamUnavailable(details) => ApiError::Upstream(details),
            CountryError::NotFound => ApiError::NotFound("Country not found"),
            CountryError::Internal(e) => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            ApiError::Upstream(details) => (StatusCode::SERVICE_UNAVAILABLE, Some(details.clone())),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Image(e) | ApiError::Internal(e) => {
                error!("{}: {:#}", self, e);
                (StatusCode::INTERNAL_SERVER_ERROR, Some(format!("{e:#}")))
            }
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
            details,
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
