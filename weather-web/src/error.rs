//! Request-level failures and their user-facing notices.

use thiserror::Error;
use weather_core::{ChartError, CityError, FetchError, StoreError};

use crate::notice::Notice;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid city: {0}")]
    InvalidCity(#[from] CityError),

    #[error("weather provider is not configured")]
    NotConfigured,

    #[error("failed to fetch weather for {city}: {source}")]
    Fetch {
        city: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to save weather for {city}: {source}")]
    Save {
        city: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to read observations: {0}")]
    Read(#[source] StoreError),

    #[error("no observations to plot")]
    NoData,

    #[error("failed to render chart: {0}")]
    Chart(#[from] ChartError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    /// Message shown to the user on the next page.
    pub fn notice(&self) -> Notice {
        match self {
            Self::InvalidCity(CityError::Empty) => Notice::error("Please enter a city name"),
            Self::InvalidCity(CityError::TooLong { .. }) => Notice::error("City name too long"),
            Self::NotConfigured => Notice::error(
                "Weather API not configured. Please set OPENWEATHER_API_KEY environment variable.",
            ),
            Self::Fetch { city, .. } => Notice::error(format!(
                "Could not fetch weather data for {city}. Please check the city name."
            )),
            Self::Save { city, .. } => {
                Notice::error(format!("Could not save weather data for {city}."))
            }
            Self::Read(_) => Notice::error("Error retrieving weather data"),
            Self::NoData => Notice::error("No weather data available for plotting"),
            Self::Chart(_) => Notice::error("Error generating temperature plot"),
            Self::Task(_) => Notice::error("Unexpected server error, please try again"),
        }
    }

    /// Expected outcomes of user input, as opposed to faults worth an error log.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidCity(_) | Self::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_notices() {
        assert_eq!(AppError::from(CityError::Empty).notice().message, "Please enter a city name");
        assert_eq!(
            AppError::from(CityError::TooLong { max: 50, actual: 51 }).notice().message,
            "City name too long"
        );
    }

    #[test]
    fn fetch_notice_names_city() {
        let err = AppError::Fetch { city: "Atlantis".into(), source: FetchError::Malformed("x".into()) };
        assert!(err.notice().message.contains("Atlantis"));
    }

    #[test]
    fn user_errors_are_classified() {
        assert!(AppError::NoData.is_user_error());
        assert!(!AppError::NotConfigured.is_user_error());
        assert!(!AppError::Chart(ChartError::Empty).is_user_error());
    }
}
