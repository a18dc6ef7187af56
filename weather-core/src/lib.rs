//! Core library for the weather history web app.
//!
//! This crate defines:
//! - Configuration loading (defaults, TOML file, environment)
//! - The weather provider abstraction and its OpenWeather client
//! - The SQLite record store of past observations
//! - The temperature bar-chart renderer
//! - Shared domain models and per-component error types
//!
//! It is used by `weather-web`, but has no dependency on any HTTP server.

pub mod chart;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod store;

pub use config::{Config, Profile};
pub use error::{ChartError, CityError, FetchError, StoreError};
pub use model::{City, Conditions, Observation};
pub use provider::{WeatherProvider, provider_from_config};
pub use store::RecordStore;
