use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CityError;

/// A trimmed, non-empty, length-bounded city name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct City(String);

impl City {
    /// Validate user input. Length is counted in characters, not bytes.
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, CityError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CityError::Empty);
        }

        let actual = trimmed.chars().count();
        if actual > max_len {
            return Err(CityError::TooLong { max: max_len, actual });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized current conditions as reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub temperature: f64,
    pub humidity: u8,
    pub description: String,
}

/// One stored reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub city: String,
    pub temperature: f64,
    pub humidity: u8,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_whitespace() {
        let city = City::parse("  London \n", 50).expect("valid city");
        assert_eq!(city.as_str(), "London");
    }

    #[test]
    fn parse_rejects_blank() {
        assert_eq!(City::parse("", 50), Err(CityError::Empty));
        assert_eq!(City::parse("   ", 50), Err(CityError::Empty));
    }

    #[test]
    fn parse_rejects_long_names() {
        let long = "a".repeat(100);
        assert_eq!(City::parse(&long, 50), Err(CityError::TooLong { max: 50, actual: 100 }));
    }

    #[test]
    fn parse_accepts_exact_limit() {
        assert!(City::parse(&"a".repeat(50), 50).is_ok());
    }

    #[test]
    fn parse_counts_characters() {
        // 5 characters, 9 bytes
        let city = City::parse("Łódźź", 5).expect("five characters fit");
        assert_eq!(city.to_string(), "Łódźź");
    }
}
