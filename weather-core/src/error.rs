//! Error types for each component boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Rejected city input. Raised before any I/O happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CityError {
    #[error("city name is empty")]
    Empty,

    #[error("city name is {actual} characters long, maximum is {max}")]
    TooLong { max: usize, actual: usize },
}

/// Anything that keeps the provider from producing usable conditions.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("no API key configured for the weather provider")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to create database directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("no entries to plot")]
    Empty,

    #[error("failed to load chart font: {0}")]
    Font(String),

    #[error("failed to draw chart: {0}")]
    Draw(String),

    #[error("failed to encode chart: {0}")]
    Encode(#[from] image::ImageError),

    #[error("chart file error: {0}")]
    Io(#[from] std::io::Error),
}
