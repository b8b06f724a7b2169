//! Prediction log store
//!
//! The "black box" recorder: every served prediction becomes one row in an
//! append-only CSV store, which the monitoring aggregator later reads back.
//! The store is behind a trait so tests (and any future embedded backend)
//! can swap the file out for an in-memory one.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

/// Fixed schema header, written exactly once when a store file is created
pub const CSV_HEADER: &str = "timestamp,latency_ms,flow,ph,conductivity,cod,prediction,status";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("log store unavailable: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt log record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}

/// One served prediction, as persisted to the store
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: String,
    pub latency_ms: f64,
    pub flow: f64,
    pub ph: f64,
    pub conductivity: f64,
    pub cod: f64,
    pub prediction: f64,
    pub status: String,
}

impl LogRecord {
    /// Render as one CSV row (no trailing newline). Latency and prediction
    /// keep two decimals, matching the historical store format.
    fn to_csv_row(&self) -> String {
        format!(
            "{},{:.2},{},{},{},{},{:.2},{}",
            self.timestamp,
            self.latency_ms,
            self.flow,
            self.ph,
            self.conductivity,
            self.cod,
            self.prediction,
            self.status
        )
    }

    fn parse_csv_row(row: &str, line: usize) -> Result<Self, StoreError> {
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != 8 {
            return Err(StoreError::Corrupt {
                line,
                reason: format!("expected 8 fields, found {}", fields.len()),
            });
        }

        let number = |index: usize, name: &str| -> Result<f64, StoreError> {
            fields[index].trim().parse::<f64>().map_err(|_| StoreError::Corrupt {
                line,
                reason: format!("field '{}' is not a number: '{}'", name, fields[index]),
            })
        };

        Ok(Self {
            timestamp: fields[0].to_string(),
            latency_ms: number(1, "latency_ms")?,
            flow: number(2, "flow")?,
            ph: number(3, "ph")?,
            conductivity: number(4, "conductivity")?,
            cod: number(5, "cod")?,
            prediction: number(6, "prediction")?,
            status: fields[7].to_string(),
        })
    }
}

/// Storage abstraction for the prediction log.
///
/// Writers are the prediction path (one append per request), the single
/// reader is the monitoring aggregator. Records are never updated or
/// deleted.
pub trait LogStore: Send + Sync {
    /// Durably append one record. Atomic with respect to other appends.
    fn append(&self, record: &LogRecord) -> Result<(), StoreError>;

    /// Read every record ever written, in append order.
    fn read_all(&self) -> Result<Vec<LogRecord>, StoreError>;

    /// True total row count plus the most recent `n` records.
    fn read_tail(&self, n: usize) -> Result<(usize, Vec<LogRecord>), StoreError> {
        let all = self.read_all()?;
        let total = all.len();
        let start = total.saturating_sub(n);
        Ok((total, all[start..].to_vec()))
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// CSV-file backed store. Appends are serialized behind a mutex and each
/// record is written as a single whole line, so concurrent requests can
/// never interleave partial rows.
pub struct FileLogStore {
    file: Mutex<File>,
    path: PathBuf,
}

impl FileLogStore {
    /// Open the store, creating the file (and parent directories) with the
    /// schema header if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", CSV_HEADER)?;
            file.flush()?;
        }

        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogStore for FileLogStore {
    fn append(&self, record: &LogRecord) -> Result<(), StoreError> {
        let mut row = record.to_csv_row();
        row.push('\n');

        let mut file = self.file.lock();
        file.write_all(row.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<LogRecord>, StoreError> {
        // Separate read handle; the shared handle stays append-only.
        let reader = BufReader::new(File::open(&self.path)?);

        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() || line == CSV_HEADER {
                continue;
            }
            records.push(LogRecord::parse_csv_row(&line, index + 1)?);
        }
        Ok(records)
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-memory store for tests
#[derive(Default)]
pub struct MemoryLogStore {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogStore for MemoryLogStore {
    fn append(&self, record: &LogRecord) -> Result<(), StoreError> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<LogRecord>, StoreError> {
        Ok(self.records.lock().clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(prediction: f64) -> LogRecord {
        LogRecord {
            timestamp: "2026-08-29T10:00:00.000".to_string(),
            latency_ms: 1.25,
            flow: 35000.0,
            ph: 7.6,
            conductivity: 1800.0,
            cod: 350.0,
            prediction,
            status: "Normal".to_string(),
        }
    }

    #[test]
    fn test_file_store_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitoring_logs.csv");

        {
            let store = FileLogStore::open(&path).unwrap();
            store.append(&record(120.0)).unwrap();
        }
        // Re-open an existing store; the header must not be duplicated.
        let store = FileLogStore::open(&path).unwrap();
        store.append(&record(130.0)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches(CSV_HEADER).count(), 1);
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.starts_with(CSV_HEADER));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLogStore::open(dir.path().join("log.csv")).unwrap();

        let written = record(432.1);
        store.append(&written).unwrap();

        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].flow, written.flow);
        assert_eq!(records[0].conductivity, written.conductivity);
        assert!((records[0].prediction - 432.1).abs() < 1e-9);
        assert_eq!(records[0].status, "Normal");
    }

    #[test]
    fn test_file_store_concurrent_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileLogStore::open(dir.path().join("log.csv")).unwrap());

        let threads = 8;
        let per_thread = 25;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        store.append(&record((t * per_thread + i) as f64)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // No lost, duplicated, or torn rows.
        let records = store.read_all().unwrap();
        assert_eq!(records.len(), threads * per_thread);
    }

    #[test]
    fn test_read_tail_window() {
        let store = MemoryLogStore::new();
        for i in 0..70 {
            store.append(&record(i as f64)).unwrap();
        }

        let (total, recent) = store.read_tail(50).unwrap();
        assert_eq!(total, 70);
        assert_eq!(recent.len(), 50);
        assert_eq!(recent[0].prediction, 20.0);
        assert_eq!(recent[49].prediction, 69.0);
    }

    #[test]
    fn test_read_tail_fewer_records_than_window() {
        let store = MemoryLogStore::new();
        store.append(&record(1.0)).unwrap();

        let (total, recent) = store.read_tail(50).unwrap();
        assert_eq!(total, 1);
        assert_eq!(recent.len(), 1);
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let store = FileLogStore::open(&path).unwrap();
        store.append(&record(10.0)).unwrap();

        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"not,a,valid,row\n")
            .unwrap();

        match store.read_all() {
            Err(StoreError::Corrupt { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected corrupt-row error, got {:?}", other),
        }
    }
}
