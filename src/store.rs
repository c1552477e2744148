//! Snapshots of the reference data, with a daily background refresh.
//!
//! Proposals are generated against a [`ReferenceData`] snapshot. Readers take a cheap clone of
//! the current snapshot, so a refresh which swaps in new data never exposes a partly-loaded table.
//!
//! The CLI loads a store once per run. [`RefreshTask`] is for long-running embedders, such as a
//! proposal service, which keep a store alive across days.
use crate::contact::AgentDirectory;
use crate::flag::FlagSurcharges;
use crate::input::read_reference_data;
use crate::tariff::TariffTable;
use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Everything a proposal needs from outside the request
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    /// Tariff schedules
    pub tariffs: TariffTable,
    /// Tariff flag surcharges
    pub flags: FlagSurcharges,
    /// Agent contact details
    pub agents: AgentDirectory,
}

/// Somewhere fresh reference data can be fetched from
pub trait ReferenceSource {
    /// Fetch a complete copy of the reference data
    fn fetch(&self) -> Result<ReferenceData>;
}

/// Reads reference data from files in a folder
#[derive(Debug, Clone)]
pub struct DirectorySource(PathBuf);

impl DirectorySource {
    /// Create a source for the given folder
    pub fn new(reference_dir: &Path) -> Self {
        Self(reference_dir.to_path_buf())
    }
}

impl ReferenceSource for DirectorySource {
    fn fetch(&self) -> Result<ReferenceData> {
        read_reference_data(&self.0)
    }
}

#[derive(Debug)]
struct StoreState {
    data: Arc<ReferenceData>,
    last_refreshed: Option<NaiveDate>,
}

/// Holds the current reference data snapshot
#[derive(Debug)]
pub struct ReferenceStore(RwLock<StoreState>);

impl ReferenceStore {
    /// Create a store holding the given data, which counts as never having been refreshed
    pub fn new(data: ReferenceData) -> Self {
        Self(RwLock::new(StoreState {
            data: Arc::new(data),
            last_refreshed: None,
        }))
    }

    /// Create a store with data fetched from a source on the given day
    pub fn load(source: &dyn ReferenceSource, today: NaiveDate) -> Result<Self> {
        let store = Self::new(source.fetch()?);
        store.mark_refreshed(today);
        Ok(store)
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Arc<ReferenceData> {
        let state = self.0.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&state.data)
    }

    /// The day the data was last refreshed, if ever
    pub fn last_refreshed(&self) -> Option<NaiveDate> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_refreshed
    }

    /// Swap in new data, recording the day of the refresh
    pub fn replace(&self, data: ReferenceData, today: NaiveDate) {
        let mut state = self.0.write().unwrap_or_else(PoisonError::into_inner);
        state.data = Arc::new(data);
        state.last_refreshed = Some(today);
    }

    fn mark_refreshed(&self, today: NaiveDate) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .last_refreshed = Some(today);
    }

    /// Refresh from the source unless the data was already refreshed today.
    ///
    /// The fetch happens without holding the lock, so readers are never blocked by a slow source.
    /// If the fetch fails, the current snapshot is kept.
    ///
    /// # Returns
    ///
    /// Whether the data was refreshed.
    pub fn refresh_if_stale(&self, source: &dyn ReferenceSource, today: NaiveDate) -> Result<bool> {
        if self.last_refreshed() == Some(today) {
            return Ok(false);
        }

        let data = source.fetch()?;
        self.replace(data, today);
        Ok(true)
    }
}

/// How long from `now` until the start of the next day
fn duration_until_next_midnight(now: NaiveDateTime) -> Duration {
    let Some(tomorrow) = now.date().succ_opt() else {
        return Duration::ZERO;
    };
    let midnight = tomorrow.and_time(chrono::NaiveTime::MIN);

    (midnight - now)
        .max(TimeDelta::zero())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// A background thread which refreshes a [`ReferenceStore`] once a day
#[derive(Debug)]
pub struct RefreshTask {
    cancel_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshTask {
    /// Start refreshing the store in the background.
    ///
    /// The store is refreshed straight away if it is stale, then again after each local midnight.
    /// Failed refreshes are logged and retried at the next midnight.
    pub fn spawn<S>(store: Arc<ReferenceStore>, source: S) -> Result<Self>
    where
        S: ReferenceSource + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("reference-refresh".into())
            .spawn(move || {
                loop {
                    match store.refresh_if_stale(&source, Local::now().date_naive()) {
                        Ok(true) => info!("Reference data refreshed"),
                        Ok(false) => debug!("Reference data already refreshed today"),
                        Err(err) => error!("Failed to refresh reference data: {err:?}"),
                    }

                    let wait = duration_until_next_midnight(Local::now().naive_local());
                    if !matches!(cancel_rx.recv_timeout(wait), Err(RecvTimeoutError::Timeout)) {
                        // Cancelled or the task handle was dropped
                        break;
                    }
                }
            })?;

        Ok(Self {
            cancel_tx: Some(cancel_tx),
            handle: Some(handle),
        })
    }

    /// Stop the task, waiting for the thread to finish
    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            // The thread may already have exited, in which case there is no one to tell
            let _ = cancel_tx.send(());
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("Reference refresh thread panicked");
        }
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.stop();
    }
}
