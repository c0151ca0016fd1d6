//! HTTP surface over the country store.

pub mod countries;
pub mod error;

use crate::core::store::CountryStore;
use crate::refresh::RefreshEngine;
use crate::summary::SummaryImage;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub store: Arc<dyn CountryStore>,
    pub engine: RefreshEngine,
    pub summary: Arc<SummaryImage>,
}

async fn root() -> &'static str {
    "Country API is running"
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(countries::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
