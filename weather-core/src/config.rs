use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

/// Database path that selects an in-memory store.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5";

/// Deployment profile, selected with `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Development,
    Production,
    Testing,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Development => "development",
            Profile::Production => "production",
            Profile::Testing => "testing",
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Profile::Development => "info,weather_core=debug,weather_web=debug,tower_http=debug",
            Profile::Production | Profile::Testing => "info,tower_http=info",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "default" => Ok(Profile::Development),
            "production" => Ok(Profile::Production),
            "testing" => Ok(Profile::Testing),
            _ => Err(anyhow!(
                "Unknown profile '{value}'. Supported profiles: development, production, testing."
            )),
        }
    }
}

/// Application settings. Built once at startup and never mutated afterwards.
///
/// Example TOML:
/// ```toml
/// openweather_api_key = "..."
/// database_file = "/var/lib/weather/weather_data.db"
/// plot_max_entries = 20
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profile: Profile,

    /// Credential for the OpenWeather API. Submissions are rejected without it.
    pub openweather_api_key: Option<String>,

    pub openweather_base_url: String,

    /// SQLite file, or `:memory:`.
    pub database_file: PathBuf,

    /// Timeout for the outbound provider call, in seconds.
    pub api_timeout_secs: u64,

    pub max_city_length: usize,

    /// How many of the most recent observations the chart shows.
    pub plot_max_entries: usize,

    pub port: u16,

    /// Directory the chart image is written to.
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            openweather_api_key: None,
            openweather_base_url: DEFAULT_BASE_URL.to_string(),
            database_file: PathBuf::from("weather_data.db"),
            api_timeout_secs: 10,
            max_city_length: 50,
            plot_max_entries: 10,
            port: 5000,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (explicit path, or the platform config
    /// file when it exists), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::config_file_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Override fields from environment variables. `lookup` is `std::env::var`
    /// in production and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("APP_ENV") {
            self.profile = v.parse()?;
        }
        if let Some(v) = lookup("OPENWEATHER_API_KEY") {
            self.openweather_api_key = Some(v);
        }
        if let Some(v) = lookup("OPENWEATHER_BASE_URL") {
            self.openweather_base_url = v;
        }
        if let Some(v) = lookup("DATABASE_FILE") {
            self.database_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("API_TIMEOUT") {
            self.api_timeout_secs = parse_env("API_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("MAX_CITY_LENGTH") {
            self.max_city_length = parse_env("MAX_CITY_LENGTH", &v)?;
        }
        if let Some(v) = lookup("PLOT_MAX_ENTRIES") {
            self.plot_max_entries = parse_env("PLOT_MAX_ENTRIES", &v)?;
        }
        if let Some(v) = lookup("PORT") {
            self.port = parse_env("PORT", &v)?;
        }
        if let Some(v) = lookup("STATIC_FOLDER") {
            self.static_dir = PathBuf::from(v);
        }

        // The testing profile never touches disk.
        if self.profile == Profile::Testing {
            self.database_file = PathBuf::from(IN_MEMORY_DATABASE);
        }

        Ok(())
    }

    /// Path to the optional config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-web")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Returns the API key, treating a blank value as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.openweather_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn uses_in_memory_database(&self) -> bool {
        self.database_file == Path::new(IN_MEMORY_DATABASE)
    }

    /// Where the chart renderer writes its image.
    pub fn plot_path(&self) -> PathBuf {
        self.static_dir.join("plot.png")
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {key}: '{value}'"))
}
