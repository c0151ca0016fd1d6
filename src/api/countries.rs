use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::core::country::Country;
use crate::core::error::CountryError;
use crate::core::query::CountryQuery;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LastRefresh {
    At(DateTime<Utc>),
    Never(&'static str),
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub total_countries: usize,
    pub last_refreshed_at: LastRefresh,
}

async fn refresh_countries(State(state): State<Arc<AppState>>) -> ApiResult<Json<RefreshResponse>> {
    let outcome = state.engine.refresh().await?;
    Ok(Json(RefreshResponse {
        message: "Countries refreshed successfully",
        total: outcome.total,
    }))
}

async fn list_countries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Country>>> {
    let query = CountryQuery::from_params(
        params.region.as_deref(),
        params.currency.as_deref(),
        params.sort.as_deref(),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    debug!("Listing countries with {:?}", query);
    let countries = state.store.find_all(&query).await?;
    Ok(Json(countries))
}

async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatusResponse>> {
    let total_countries = state.store.count().await?;
    let last_refreshed_at = match state.store.last_refreshed_at().await? {
        Some(at) => LastRefresh::At(at),
        None => LastRefresh::Never("Not refreshed yet"),
    };
    Ok(Json(StatusResponse {
        status: "ok",
        total_countries,
        last_refreshed_at,
    }))
}

const NO_COUNTRIES: &str = "No countries found. Run /countries/refresh first.";

async fn get_summary_image(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let countries = state.store.find_all(&CountryQuery::default()).await?;
    if countries.is_empty() {
        return Err(ApiError::NotFound(NO_COUNTRIES));
    }
    let png = state
        .summary
        .generate_png(&countries)
        .await
        .map_err(ApiError::Image)?
        .ok_or(ApiError::NotFound(NO_COUNTRIES))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

async fn get_country(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Country>> {
    let country = state
        .store
        .find_by_name(&name)
        .await?
        .ok_or(CountryError::NotFound)?;
    Ok(Json(country))
}

async fn delete_country(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<MessageResponse>> {
    let removed = state.store.delete_by_name(&name).await?;
    if removed == 0 {
        return Err(CountryError::NotFound.into());
    }
    debug!("Deleted {} row(s) named {}", removed, name);
    Ok(Json(MessageResponse {
        message: "Country deleted successfully",
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/countries", get(list_countries))
        .route("/countries/refresh", post(refresh_countries))
        .route("/countries/status", get(get_status))
        .route("/countries/image", get(get_summary_image))
        .route("/countries/{name}", get(get_country).delete(delete_country))
}
