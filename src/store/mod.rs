use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::Mutex;
use tokio::task;

use std::fs;
use std::path::{Path, PathBuf};

use crate::sensor::SensorGroups;

pub const HEADERS: [&str; 4] = ["Date", "Sensor Outside", "Sensor Inside", "Sensor Hive"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug)]
pub struct Reading {
    pub timestamp: String,
    pub outside: String,
    pub inside: String,
    pub hive: String,
}

impl Reading {
    /// Stamps the parsed groups with the current local wall-clock time.
    pub fn now(groups: SensorGroups) -> Reading {
        Reading {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            outside: groups.outside,
            inside: groups.inside,
            hive: groups.hive,
        }
    }
}

/// Append-only CSV file holding all persisted readings. Every access goes
/// through one serializing lock and performs a full open-write-close (or
/// open-read-close) cycle; no handle is kept between calls.
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    file_lock: Mutex<()>,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> CsvStore {
        CsvStore {
            path: path.into(),
            file_lock: Mutex::new(()),
        }
    }

    /// Creates the backing file with the default header row if it does not
    /// exist yet. Leaves an existing file untouched.
    pub async fn ensure_header(&self) -> Result<()> {
        let _guard = self.file_lock.lock().await;

        let path = self.path.clone();
        task::spawn_blocking(move || write_header_if_missing(&path)).await?
    }

    pub async fn append(&self, reading: Reading) -> Result<()> {
        let _guard = self.file_lock.lock().await;

        let path = self.path.clone();
        task::spawn_blocking(move || append_record(&path, &reading)).await?
    }

    /// Reads the whole file back as a header row plus data rows. An empty
    /// file yields the built-in default headers and no data rows.
    pub async fn read_all(&self) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        let _guard = self.file_lock.lock().await;

        let path = self.path.clone();
        task::spawn_blocking(move || read_records(&path)).await?
    }
}

fn write_header_if_missing(path: &Path) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }

    log::info!("Creating {} with default headers", path.display());

    let file = fs::File::create(path)
        .with_context(|| format!("creating backing store {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(HEADERS)?;
    writer.flush()?;

    Ok(())
}

fn append_record(path: &Path, reading: &Reading) -> Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening backing store {}", path.display()))?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record([
        &reading.timestamp,
        &reading.outside,
        &reading.inside,
        &reading.hive,
    ])?;
    writer.flush()?;

    Ok(())
}

fn read_records(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening backing store {}", path.display()))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("reading CSV record")?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<String>>());
    }

    let headers = if rows.is_empty() {
        HEADERS.map(str::to_string).to_vec()
    } else {
        rows.remove(0)
    };

    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn store_in(dir: &TempDir) -> CsvStore {
        CsvStore::new(dir.path().join("data.csv"))
    }

    fn reading(outside: &str, inside: &str, hive: &str) -> Reading {
        Reading {
            timestamp: "2026-08-29 12:00:00".to_string(),
            outside: outside.to_string(),
            inside: inside.to_string(),
            hive: hive.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ensure_header_creates_file_with_default_headers() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);

        store.ensure_header().await.expect("ensure header");

        let (headers, rows) = store.read_all().await.expect("read all");
        assert_eq!(headers, HEADERS.map(str::to_string).to_vec());
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_header_keeps_existing_rows() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);

        store.ensure_header().await.expect("ensure header");
        store
            .append(reading("DHT1 t=20", "DHT2 t=21", "SHT h=55"))
            .await
            .expect("append");
        store.ensure_header().await.expect("ensure header again");

        let (_, rows) = store.read_all().await.expect("read all");
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_append_adds_exactly_one_row() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        store.ensure_header().await.expect("ensure header");

        store
            .append(reading("DHT1 t=20", "DHT2 t=21", "SHT h=55"))
            .await
            .expect("append");

        let (_, rows) = store.read_all().await.expect("read all");
        assert_eq!(
            rows,
            vec![vec![
                "2026-08-29 12:00:00".to_string(),
                "DHT1 t=20".to_string(),
                "DHT2 t=21".to_string(),
                "SHT h=55".to_string(),
            ]]
        );
    }

    #[tokio::test]
    async fn test_comma_in_field_stays_one_column() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);
        store.ensure_header().await.expect("ensure header");

        store
            .append(reading("DHT1 t=20, DHT1 h=40", "", ""))
            .await
            .expect("append");

        let (_, rows) = store.read_all().await.expect("read all");
        assert_eq!(rows[0].len(), 4);
        assert_eq!(rows[0][1], "DHT1 t=20, DHT1 h=40");
    }

    #[tokio::test]
    async fn test_read_all_on_empty_file_falls_back_to_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("data.csv");
        fs::write(&path, "").expect("touch file");

        let store = CsvStore::new(path);
        let (headers, rows) = store.read_all().await.expect("read all");

        assert_eq!(headers, HEADERS.map(str::to_string).to_vec());
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_read_all_on_missing_file_fails() {
        let dir = TempDir::new().expect("tempdir");
        let store = store_in(&dir);

        assert!(store.read_all().await.is_err());
    }
}
