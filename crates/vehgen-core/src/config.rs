//! Generator configuration that downstream crates can serialize/deserialize.
//!
//! Layering, lowest priority first:
//! 1. `GeneratorConfig::default()`
//! 2. `appsettings.json` (required when loading a directory)
//! 3. `appsettings.Debug.json` (optional, merged key by key)
//! 4. `VEHGEN_*` environment variables (`apply_env`)
//! 5. CLI flags (applied by the binary)

use std::fs;
use std::path::Path;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::schema::ColumnSpec;

pub const BASE_SETTINGS_FILE: &str = "appsettings.json";
pub const DEBUG_SETTINGS_FILE: &str = "appsettings.Debug.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Gzip,
    None,
}

impl Compression {
    /// File extension of the produced artifact, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Compression::Gzip => "csv.gz",
            Compression::None => "csv",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Some(Compression::Gzip),
            "none" | "plain" => Some(Compression::None),
            _ => None,
        }
    }
}

/// Bounding box for the coordinate columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    /// Last generated day; earlier days are derived from it.
    #[serde(deserialize_with = "de_date")]
    pub end_date: NaiveDate,

    pub count_of_days: u32,

    /// VIN pool size, and the exclusive upper bound of the VIN suffix.
    pub count_of_cars: u32,

    pub rows_per_batch: usize,

    /// Comma-separated `name|type` pairs.
    pub to_be_generated: String,

    /// Window size: day-chains executed concurrently.
    pub parallel_task_count: usize,

    pub vin_prefix: String,

    pub storage_connection_string: Option<String>,
    pub container_name: String,

    /// Optional sink selector (`memory://`, `file:///path`, `azure://`).
    /// When absent, a connection string selects Azure.
    pub storage_uri: Option<String>,

    /// Local staging root; artifacts land in `<output_dir>/<YYYYMMDD>/`.
    pub output_dir: String,

    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,

    /// Optional seed for reproducible rows (trace ids and file names stay random).
    pub seed: Option<u64>,

    pub compression: Compression,

    /// Upload retry policy, handed to the sink.
    pub upload_max_retries: usize,
    pub upload_initial_backoff_ms: u64,
    pub upload_max_backoff_ms: u64,
    pub upload_timeout_ms: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            end_date: NaiveDate::from_ymd_opt(2021, 6, 30).unwrap_or_default(),
            count_of_days: 1,
            count_of_cars: 100,
            rows_per_batch: 1_000,
            to_be_generated: "vin|VARCHAR,ts|TIMESTAMP,backend_ts|TIMESTAMP,traceId|VARCHAR,\
                              gps_lon|DECIMAL,gps_lat|DECIMAL,speed|DECIMAL,ignition|BOOLEAN"
                .to_string(),
            parallel_task_count: 4,
            vin_prefix: "WVW".to_string(),
            storage_connection_string: None,
            container_name: "vehicle-data".to_string(),
            storage_uri: None,
            output_dir: "/tmp/vehgen-output".to_string(),
            lon_min: 5.866,
            lon_max: 15.041,
            lat_min: 47.270,
            lat_max: 55.058,
            seed: None,
            compression: Compression::Gzip,
            upload_max_retries: 4,
            upload_initial_backoff_ms: 30_000,
            upload_max_backoff_ms: 480_000,
            upload_timeout_ms: 30_000,
        }
    }
}

/// Snapshot of the upload-sink settings consumed by the IO layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub uri: Option<String>,
    pub connection_string: Option<String>,
    pub container: String,
    pub retry_max_retries: usize,
    pub retry_initial_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,
    pub timeout_ms: u64,
}

impl StorageConfig {
    /// Sink scheme: the URI scheme when a URI is set, otherwise `azure` when a
    /// connection string is present.
    pub fn scheme(&self) -> Option<&str> {
        match self.uri.as_deref() {
            Some(uri) => uri
                .split("://")
                .next()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty()),
            None => self.connection_string.as_ref().map(|_| "azure"),
        }
    }
}

impl GeneratorConfig {
    /// Load settings from a file, or from `appsettings.json` (+ optional
    /// `appsettings.Debug.json`) when `path` is a directory.
    pub fn load(path: &Path) -> Result<Self> {
        let merged = if path.is_dir() {
            let mut base = read_settings(&path.join(BASE_SETTINGS_FILE))?;
            let debug = path.join(DEBUG_SETTINGS_FILE);
            if debug.is_file() {
                merge_settings(&mut base, read_settings(&debug)?);
            }
            base
        } else {
            read_settings(path)?
        };
        Ok(serde_json::from_value(merged)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Apply `VEHGEN_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparsable values are ignored.
    ///
    /// Variables:
    /// - `VEHGEN_END_DATE`, `VEHGEN_COUNT_OF_DAYS`, `VEHGEN_COUNT_OF_CARS`
    /// - `VEHGEN_ROWS_PER_BATCH`, `VEHGEN_TO_BE_GENERATED`, `VEHGEN_PARALLEL_TASK_COUNT`
    /// - `VEHGEN_VIN_PREFIX`, `VEHGEN_STORAGE_CONNECTION_STRING`, `VEHGEN_CONTAINER_NAME`
    /// - `VEHGEN_STORAGE_URI`, `VEHGEN_OUTPUT_DIR`, `VEHGEN_SEED`, `VEHGEN_COMPRESSION`
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("VEHGEN_END_DATE").and_then(|s| parse_date(&s)) {
            self.end_date = v;
        }
        if let Some(v) = lookup("VEHGEN_COUNT_OF_DAYS").and_then(|s| s.parse().ok()) {
            self.count_of_days = v;
        }
        if let Some(v) = lookup("VEHGEN_COUNT_OF_CARS").and_then(|s| s.parse().ok()) {
            self.count_of_cars = v;
        }
        if let Some(v) = lookup("VEHGEN_ROWS_PER_BATCH").and_then(|s| s.parse().ok()) {
            self.rows_per_batch = v;
        }
        if let Some(v) = lookup("VEHGEN_TO_BE_GENERATED") {
            self.to_be_generated = v;
        }
        if let Some(v) = lookup("VEHGEN_PARALLEL_TASK_COUNT").and_then(|s| s.parse().ok()) {
            self.parallel_task_count = v;
        }
        if let Some(v) = lookup("VEHGEN_VIN_PREFIX") {
            self.vin_prefix = v;
        }
        if let Some(v) = lookup("VEHGEN_STORAGE_CONNECTION_STRING") {
            self.storage_connection_string = Some(v);
        }
        if let Some(v) = lookup("VEHGEN_CONTAINER_NAME") {
            self.container_name = v;
        }
        if let Some(v) = lookup("VEHGEN_STORAGE_URI") {
            self.storage_uri = Some(v);
        }
        if let Some(v) = lookup("VEHGEN_OUTPUT_DIR") {
            self.output_dir = v;
        }
        if let Some(v) = lookup("VEHGEN_SEED").and_then(|s| s.parse().ok()) {
            self.seed = Some(v);
        }
        if let Some(v) = lookup("VEHGEN_COMPRESSION").and_then(|s| Compression::from_name(&s)) {
            self.compression = v;
        }
    }

    pub fn columns(&self) -> ColumnSpec {
        ColumnSpec::parse(&self.to_be_generated)
    }

    pub fn geo_bounds(&self) -> GeoBounds {
        GeoBounds {
            lon_min: self.lon_min,
            lon_max: self.lon_max,
            lat_min: self.lat_min,
            lat_max: self.lat_max,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.count_of_cars < 1 {
            return Err(Error::Config("countOfCars must be at least 1".into()));
        }
        if self.parallel_task_count < 1 {
            return Err(Error::Config("parallelTaskCount must be at least 1".into()));
        }
        if self.columns().is_empty() {
            return Err(Error::Config(
                "toBeGenerated yields no columns (expected `name|type` entries)".into(),
            ));
        }
        check_range("longitude", self.lon_min, self.lon_max)?;
        check_range("latitude", self.lat_min, self.lat_max)?;
        self.first_day()?;
        Ok(())
    }

    /// Earliest generated day (`endDate - (countOfDays - 1)`), or `endDate`
    /// when no days are requested.
    pub fn first_day(&self) -> Result<NaiveDate> {
        let back = u64::from(self.count_of_days.saturating_sub(1));
        self.end_date.checked_sub_days(Days::new(back)).ok_or_else(|| {
            Error::Config(format!(
                "countOfDays {} from endDate {} reaches before the supported calendar",
                self.count_of_days, self.end_date
            ))
        })
    }

    /// Produce a storage configuration snapshot used by the IO layer.
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            uri: self.storage_uri.clone(),
            connection_string: self.storage_connection_string.clone(),
            container: self.container_name.clone(),
            retry_max_retries: self.upload_max_retries,
            retry_initial_backoff_ms: self.upload_initial_backoff_ms,
            retry_max_backoff_ms: self.upload_max_backoff_ms,
            timeout_ms: self.upload_timeout_ms,
        }
    }
}

fn check_range(what: &str, min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() {
        return Err(Error::Config(format!("{what} bounds must be finite")));
    }
    if min > max {
        return Err(Error::Config(format!(
            "{what} bounds are inverted: min {min} > max {max}"
        )));
    }
    Ok(())
}

fn read_settings(path: &Path) -> Result<serde_json::Value> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::Settings(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| Error::Settings(format!("{}: {e}", path.display())))
}

fn merge_settings(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (k, v) in overlay {
                base.insert(k, v);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Accepts `YYYY-MM-DD` as well as a full `YYYY-MM-DDTHH:MM:SS` instant.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn de_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid endDate '{raw}'")))
}
