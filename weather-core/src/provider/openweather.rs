use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{City, Conditions, config::DEFAULT_BASE_URL, error::FetchError};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    /// Point the client at another host, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn fetch_current(&self, city: &City) -> Result<Conditions, FetchError> {
        let url = format!("{}/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .inspect_err(|e| warn!(%city, error = %e, "Network error fetching weather data"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .inspect_err(|e| warn!(%city, error = %e, "Failed to read OpenWeather response body"))?;

        if !status.is_success() {
            warn!(%city, %status, "OpenWeather request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(%city, error = %e, "Invalid OpenWeather response format");
            FetchError::Malformed(e.to_string())
        })?;

        let description = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or_else(|| {
                warn!(%city, "OpenWeather response contained no weather entries");
                FetchError::Malformed("empty `weather` array".to_string())
            })?;

        debug!(%city, temperature = parsed.main.temp, "Fetched current conditions");

        Ok(Conditions {
            temperature: parsed.main.temp,
            humidity: parsed.main.humidity,
            description,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwWeather>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_conditions(&self, city: &City) -> Result<Conditions, FetchError> {
        self.fetch_current(city).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
