use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use weather_core::{Config, RecordStore, WeatherProvider};

use crate::{handlers, views::Views};

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<RecordStore>,
    /// `None` when no API key is configured; submissions are then rejected.
    pub provider: Option<Arc<dyn WeatherProvider>>,
    pub views: Arc<Views>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: RecordStore,
        provider: Option<Arc<dyn WeatherProvider>>,
    ) -> Result<Self, tera::Error> {
        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            provider,
            views: Arc::new(Views::new()?),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/add_city", post(handlers::add_city))
        .route("/weather", get(handlers::weather))
        .route("/plot", get(handlers::plot))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
