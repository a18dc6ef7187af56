use crate::{City, Conditions, Config, error::FetchError, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Source of current conditions for a city. One attempt per call, no retries.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_conditions(&self, city: &City) -> Result<Conditions, FetchError>;
}

/// Construct the OpenWeather provider from config.
///
/// Fails with [`FetchError::NotConfigured`] when no API key is set.
pub fn provider_from_config(config: &Config) -> Result<Box<dyn WeatherProvider>, FetchError> {
    let api_key = config.api_key().ok_or(FetchError::NotConfigured)?;

    let provider = OpenWeatherProvider::new(api_key.to_owned(), config.api_timeout())?
        .with_base_url(&config.openweather_base_url);

    Ok(Box::new(provider))
}
