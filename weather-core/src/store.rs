//! SQLite-backed, append-only log of weather observations.

use std::path::Path;

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use rusqlite::{Connection, Row, params};
use tracing::info;

use crate::{City, Conditions, Observation, config::IN_MEMORY_DATABASE, error::StoreError};

const SELECT_COLUMNS: &str = "SELECT id, city, temperature, humidity, description, timestamp FROM weather";

/// Newest first; rows inserted within the same millisecond keep insertion order.
const ORDER_NEWEST_FIRST: &str = "ORDER BY timestamp DESC, id DESC";

pub struct RecordStore {
    conn: Mutex<Connection>,
}

impl RecordStore {
    /// Open the database file, creating parent directories as needed.
    /// `:memory:` opens a private in-memory database.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if path == Path::new(IN_MEMORY_DATABASE) {
            return Self::open_in_memory();
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Create the table if it does not exist. Safe to call on every start.
    pub fn initialize(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(
            "CREATE TABLE IF NOT EXISTS weather (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT NOT NULL,
                temperature REAL,
                humidity INTEGER,
                description TEXT,
                timestamp TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_weather_timestamp ON weather(timestamp);",
        )?;

        info!("Database initialized successfully");
        Ok(())
    }

    /// Insert one observation and return it as stored.
    pub fn append(&self, city: &City, conditions: &Conditions) -> Result<Observation, StoreError> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO weather (city, temperature, humidity, description) VALUES (?1, ?2, ?3, ?4)",
            params![city.as_str(), conditions.temperature, conditions.humidity, conditions.description],
        )?;
        let id = conn.last_insert_rowid();

        let observation = conn.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id],
            observation_from_row,
        )?;

        info!(%city, id, "Weather data saved");
        Ok(observation)
    }

    pub fn list_all(&self) -> Result<Vec<Observation>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} {ORDER_NEWEST_FIRST}"))?;

        let rows = stmt
            .query_map([], observation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// At most `limit` observations, newest first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<Observation>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} {ORDER_NEWEST_FIRST} LIMIT ?1"))?;

        let rows = stmt
            .query_map(params![limit], observation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<Observation> {
    let timestamp: NaiveDateTime = row.get(5)?;

    Ok(Observation {
        id: row.get(0)?,
        city: row.get(1)?,
        temperature: row.get(2)?,
        humidity: row.get(3)?,
        description: row.get(4)?,
        timestamp: timestamp.and_utc(),
    })
}
