//! Sources whose bytes come from an external fetch collaborator.
//!
//! The collaborator owns transport, caching and retries. This module only
//! parses what it returns and bounds how long a single fetch may take.

use std::fmt;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use super::source::{ConfigEntry, ConfigSource, Format};
use super::ConfigError;

pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// Supplies raw document bytes for a path, e.g. over HTTP or from a cache.
pub trait Fetch: Send + Sync {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

impl<F> Fetch for F
where
    F: Fn(&str) -> Result<Vec<u8>, FetchError> + Send + Sync,
{
    fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        self(path)
    }
}

/// A document fetched through a [`Fetch`] collaborator.
///
/// Fetched sources are reloadable: every store reload fetches again.
#[derive(Clone)]
pub struct FetchSource {
    path: String,
    format: Format,
    fetcher: Arc<dyn Fetch>,
    timeout: Option<Duration>,
}

impl FetchSource {
    pub fn new(path: impl Into<String>, fetcher: Arc<dyn Fetch>) -> Self {
        let path = path.into();
        let format = Format::from_path(&path);
        Self {
            path,
            format,
            fetcher,
            timeout: None,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Fails the load with `SourceUnavailable` when the fetch takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn fetch_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        let Some(timeout) = self.timeout else {
            return self
                .fetcher
                .fetch(&self.path)
                .map_err(|e| ConfigError::unavailable(self.name(), e));
        };

        // A fetch that overruns keeps its helper thread until it returns;
        // the result is dropped with the channel.
        let (tx, rx) = mpsc::sync_channel(1);
        let fetcher = Arc::clone(&self.fetcher);
        let path = self.path.clone();
        thread::Builder::new()
            .name("strata-fetch".to_string())
            .spawn(move || {
                let _ = tx.send(fetcher.fetch(&path).map_err(|e| e.to_string()));
            })
            .map_err(|e| ConfigError::unavailable(self.name(), e))?;

        match rx.recv_timeout(timeout) {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(reason)) => Err(ConfigError::unavailable(self.name(), reason)),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ConfigError::unavailable(
                self.name(),
                format!("fetch timed out after {timeout:?}"),
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ConfigError::unavailable(
                self.name(),
                "fetch worker exited without a result",
            )),
        }
    }
}

impl fmt::Debug for FetchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchSource")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ConfigSource for FetchSource {
    fn name(&self) -> String {
        format!("fetch:{}", self.path)
    }

    fn load(&self) -> Result<Vec<ConfigEntry>, ConfigError> {
        let bytes = self.fetch_bytes()?;
        self.format.parse(&self.name(), &bytes)
    }

    fn is_reloadable(&self) -> bool {
        true
    }
}
