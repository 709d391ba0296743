//! Authoritative booking ledger.
//!
//! The ledger is a CSV file with a fixed header (see [`LEDGER_HEADER`]). Rows are
//! appended on booking and rewritten in place for status and review changes.
//! All mutations go through one async mutex, and rewrites land in a temporary
//! file that is renamed over the ledger, so concurrent requests cannot lose
//! updates and readers never observe a half-written table.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::booking::{Booking, NewBooking, LEDGER_HEADER},
};

/// Attempts at drawing an unused ticket id before giving up
const MAX_ID_ATTEMPTS: usize = 32;

#[derive(Clone)]
pub struct Ledger {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl Ledger {
    /// Open the ledger, creating the file with its header when missing
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path: PathBuf = path.into();
        let ledger = Self {
            path: Arc::new(path),
            lock: Arc::new(Mutex::new(())),
        };
        ledger
            .blocking(|path| {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                if !path.exists() {
                    write_rows(path, &[])?;
                    tracing::info!("Created booking ledger at {}", path.display());
                }
                Ok(())
            })
            .await?;
        Ok(ledger)
    }

    /// Every readable row, in file order.
    ///
    /// Unreadable rows are logged and left out.
    pub async fn read_all(&self) -> AppResult<Vec<Booking>> {
        self.blocking(|path| read_rows(path, RowErrors::Skip)).await
    }

    pub async fn find(&self, ticket_id: &str) -> AppResult<Option<Booking>> {
        let ticket_id = ticket_id.to_string();
        self.blocking(move |path| {
            Ok(read_rows(path, RowErrors::Skip)?
                .into_iter()
                .find(|b| b.ticket_id == ticket_id))
        })
        .await
    }

    /// Append a new `Pending` booking under a ticket id not yet in the ledger.
    ///
    /// `next_id` is called until it yields an unused id.
    pub async fn insert<F>(&self, request: NewBooking, mut next_id: F) -> AppResult<Booking>
    where
        F: FnMut() -> String + Send + 'static,
    {
        self.blocking(move |path| {
            let taken: HashSet<String> = read_rows(path, RowErrors::Fail)?
                .into_iter()
                .map(|b| b.ticket_id)
                .collect();

            let ticket_id = (0..MAX_ID_ATTEMPTS)
                .map(|_| next_id())
                .find(|id| !taken.contains(id))
                .ok_or_else(|| AppError::Internal("Could not allocate a unique ticket id".to_string()))?;

            let booking = Booking::new(ticket_id, request);
            append_row(path, &booking)?;
            Ok(booking)
        })
        .await
    }

    /// Read-modify-write over the whole table.
    ///
    /// `mutate` returns `true` for rows it changed; the file is rewritten only
    /// when at least one row changed. Returns the changed rows. Fails without
    /// touching the file when any row cannot be read, since the rewrite would
    /// drop it.
    pub async fn update<F>(&self, mut mutate: F) -> AppResult<Vec<Booking>>
    where
        F: FnMut(&mut Booking) -> bool + Send + 'static,
    {
        self.blocking(move |path| {
            let mut rows = read_rows(path, RowErrors::Fail)?;
            let mut changed = Vec::new();
            for row in rows.iter_mut() {
                if mutate(row) {
                    changed.push(row.clone());
                }
            }
            if !changed.is_empty() {
                write_rows(path, &rows)?;
            }
            Ok(changed)
        })
        .await
    }

    /// Run blocking file work while holding the ledger lock
    async fn blocking<T, F>(&self, work: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> AppResult<T> + Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = Arc::clone(&self.path);
        tokio::task::spawn_blocking(move || work(&path))
            .await
            .map_err(|e| AppError::Internal(format!("Ledger task failed: {}", e)))?
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RowErrors {
    Skip,
    Fail,
}

fn read_rows(path: &Path, on_error: RowErrors) -> AppResult<Vec<Booking>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<Booking>().enumerate() {
        match record {
            Ok(booking) => rows.push(booking),
            Err(e) if on_error == RowErrors::Skip => {
                tracing::warn!("Skipping unreadable ledger row {}: {}", line + 2, e)
            }
            Err(e) => {
                tracing::error!("Unreadable ledger row {}, refusing to rewrite: {}", line + 2, e);
                return Err(e.into());
            }
        }
    }
    Ok(rows)
}

fn append_row(path: &Path, booking: &Booking) -> AppResult<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.serialize(booking)?;
    writer.flush()?;
    Ok(())
}

fn write_rows(path: &Path, rows: &[Booking]) -> AppResult<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(&tmp)?;
        writer.write_record(LEDGER_HEADER)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
