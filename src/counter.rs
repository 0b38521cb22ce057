//! Per-day sequence numbers used in submission filenames and branch names.
//!
//! The counter file is plain text, one `yyyyMMdd=count` record per line.
//! Records keep their file order so that a parse followed by a serialize
//! reproduces the file exactly.
//!
//! A collection reads the current value, submits, then increments. The whole
//! sequence runs under [`CounterStore::begin`] so two concurrent collections
//! can never be handed the same number.

use crate::error::{CollectorError, Result};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counter {
    records: Vec<(String, u32)>,
}

impl Counter {
    pub fn parse(text: &str) -> Result<Self> {
        let mut counter = Counter::default();
        for line in text.split('\n') {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let (date, count) = line
                .split_once('=')
                .ok_or_else(|| CollectorError::Counter(line.to_string()))?;
            let count = count
                .trim()
                .parse::<u32>()
                .map_err(|_| CollectorError::Counter(line.to_string()))?;
            counter.set(date.trim(), count);
        }
        Ok(counter)
    }

    pub fn serialize(&self) -> String {
        self.records
            .iter()
            .map(|(date, count)| format!("{date}={count}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Articles collected on `date` so far; 0 when the date is unknown.
    pub fn get(&self, date: &str) -> u32 {
        self.records
            .iter()
            .find(|(d, _)| d == date)
            .map(|(_, count)| *count)
            .unwrap_or_default()
    }

    /// Increment the count for `date`, creating it at 1, and return the new value.
    pub fn increase(&mut self, date: &str) -> u32 {
        let next = self.get(date) + 1;
        self.set(date, next);
        next
    }

    fn set(&mut self, date: &str, count: u32) {
        match self.records.iter_mut().find(|(d, _)| d == date) {
            Some(record) => record.1 = count,
            None => self.records.push((date.to_string(), count)),
        }
    }
}

/// The counter file of one site family.
#[derive(Debug)]
pub struct CounterStore {
    path: PathBuf,
    counter: Mutex<Counter>,
}

impl CounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            counter: Mutex::new(Counter::default()),
        }
    }

    /// Lock the counter and reload it from disk.
    ///
    /// The returned guard keeps every other collection waiting until it is
    /// dropped, which makes read, submit, increment and persist one step.
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn begin(&self) -> Result<CounterGuard<'_>> {
        let mut counter = self.counter.lock().await;
        *counter = if tokio::fs::try_exists(&self.path).await? {
            Counter::parse(&tokio::fs::read_to_string(&self.path).await?)?
        } else {
            debug!("Counter file missing; starting from zero");
            Counter::default()
        };
        Ok(CounterGuard {
            path: &self.path,
            counter,
        })
    }
}

pub struct CounterGuard<'a> {
    path: &'a Path,
    counter: MutexGuard<'a, Counter>,
}

impl CounterGuard<'_> {
    pub fn current(&self, date: &str) -> u32 {
        self.counter.get(date)
    }

    /// Increment `date` and write the whole counter back to disk.
    pub async fn increase_and_persist(&mut self, date: &str) -> Result<u32> {
        let value = self.counter.increase(date);
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(self.path, self.counter.serialize()).await?;
        info!(%date, value, path = %self.path.display(), "Counter persisted");
        Ok(value)
    }
}
