//! Record store
//!
//! Owns the in-memory ledger and its CSV mirror. Appends are a critical
//! section: validate, build the next ledger, persist it, then publish it.

use csv::{ReaderBuilder, WriterBuilder};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::record::{FinancialRecord, Ledger, COLUMNS};
use crate::error::{Error, Result};

/// Outcome of a load: the ledger to use plus the contained failure, if any
#[derive(Debug)]
pub struct LoadReport {
    pub ledger: Ledger,
    pub error: Option<Error>,
}

struct StoreState {
    ledger: Ledger,
    /// Last load could not read the file; refuse to overwrite it
    unreadable: bool,
}

/// Ledger owner with a durable CSV mirror
pub struct RecordStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl RecordStore {
    /// Create a store for `path`; nothing is read until [`load`](Self::load)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(StoreState {
                ledger: Ledger::default(),
                unreadable: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger file and make it current
    ///
    /// A missing file yields an empty ledger. A malformed one yields an empty
    /// ledger and the error in the report; it is never raised.
    pub fn load(&self) -> LoadReport {
        // Held across the read so an append cannot interleave with it
        let mut state = self.state.lock();

        let result = if self.path.exists() {
            read_ledger(&self.path)
        } else {
            debug!(path = %self.path.display(), "Ledger file not found, starting empty");
            Ok(Ledger::default())
        };

        match result {
            Ok(ledger) => {
                state.ledger = ledger.clone();
                state.unreadable = false;
                LoadReport {
                    ledger,
                    error: None,
                }
            }
            Err(error) => {
                state.ledger = Ledger::default();
                state.unreadable = true;
                LoadReport {
                    ledger: Ledger::default(),
                    error: Some(error),
                }
            }
        }
    }

    /// Current ledger without touching disk
    pub fn snapshot(&self) -> Ledger {
        self.state.lock().ledger.clone()
    }

    /// Validate, append and durably persist `record`
    ///
    /// Returns the new ledger only after the file has been rewritten. On any
    /// failure the current ledger is unchanged. The amount is stored rounded
    /// to whole cents, exactly as the file will hold it.
    pub fn append(&self, record: FinancialRecord) -> Result<Ledger> {
        record.validate()?;
        let record = record.normalized();

        let mut state = self.state.lock();
        if state.unreadable {
            return Err(Error::DataLoad {
                path: self.path.clone(),
                reason: "ledger file is unreadable; refusing to overwrite it".to_string(),
            });
        }

        let next = state.ledger.appended(record);
        write_ledger(&self.path, &next)?;
        state.ledger = next.clone();

        info!(path = %self.path.display(), records = next.len(), "Ledger persisted");
        Ok(next)
    }
}

/// Parse a ledger file
pub fn read_ledger(path: &Path) -> Result<Ledger> {
    let load_error = |reason: String| Error::DataLoad {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| load_error(e.to_string()))?
        .clone();
    if headers.is_empty() {
        // Zero-byte file: same as missing
        return Ok(Ledger::default());
    }
    for column in COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(load_error(format!("missing column {column:?}")));
        }
    }

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<FinancialRecord>().enumerate() {
        let record = row.map_err(|e| load_error(format!("line {}: {}", index + 2, e)))?;
        records.push(record);
    }

    Ok(Ledger::new(records))
}

/// Overwrite `path` with the full ledger
///
/// Writes a sibling temp file, syncs it and renames it over the target, so
/// readers never see a half-written ledger.
pub fn write_ledger(path: &Path, ledger: &Ledger) -> Result<()> {
    let persist_error = |source: std::io::Error| Error::Persist {
        path: path.to_path_buf(),
        source,
    };

    let tmp_path = temp_path_for(path);
    let written = write_temp(&tmp_path, ledger).and_then(|_| fs::rename(&tmp_path, path));
    if let Err(source) = written {
        // best effort; the target file is untouched either way
        let _ = fs::remove_file(&tmp_path);
        return Err(persist_error(source));
    }
    Ok(())
}

fn write_temp(tmp_path: &Path, ledger: &Ledger) -> std::io::Result<()> {
    let file = File::create(tmp_path)?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));

    writer.write_record(COLUMNS)?;
    for record in ledger.iter() {
        writer.serialize(record)?;
    }

    writer.flush()?;
    let buffered = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(e.error().kind(), e.to_string()))?;
    let file = buffered.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "ledger.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write a ledger in file format to any sink
pub fn write_ledger_to<W: Write>(sink: W, ledger: &Ledger) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(sink);
    writer.write_record(COLUMNS)?;
    for record in ledger.iter() {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
