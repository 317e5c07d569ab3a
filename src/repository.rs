use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::errors::{self, RepositoryError};
use crate::helpers::{decode_value, encode_value};
use crate::store::{CasOutcome, VersionedStore};
use crate::version::{ExpectedVersion, Version};

/// A committed increment: the new value and the version the store gave it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incremented {
    pub value: i64,
    pub version: Version,
}

/// Counter semantics over a [`VersionedStore`].
///
/// Stateless between calls. Increments are made safe against concurrent
/// writers by an optimistic compare-and-swap loop, not by any in-process
/// lock, so any number of repositories may share one store.
pub struct CounterRepository<S> {
    store: Arc<S>,
    config: Config,
}

impl<S> Clone for CounterRepository<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), config: self.config.clone() }
    }
}

impl<S: VersionedStore> CounterRepository<S> {
    /// Repository over `store`. A `max_attempts` of 0 is raised to 1 so an
    /// increment always reaches the store at least once.
    pub fn new(store: Arc<S>, mut config: Config) -> Self {
        config.max_attempts = config.max_attempts.max(1);
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current value of `name`, `None` if it was never written
    pub async fn read(&self, name: &str) -> Result<Option<i64>, RepositoryError> {
        Ok(self.load(name).await?.map(|(value, _)| value))
    }

    /// Unconditionally set `name` to `value`
    pub async fn write(&self, name: &str, value: i64) -> Result<Version, RepositoryError> {
        let encoded = encode_value(value);
        let version = self.bounded(name, "put", self.store.put(name, encoded.as_bytes())).await?;
        debug!(name, value, %version, "counter set");
        Ok(version)
    }

    /// Atomically add one to `name`, creating it at 1 if absent.
    ///
    /// Each attempt re-reads the counter, so a retry never builds on a stale
    /// value. Malformed data and overflow fail at once; only a lost
    /// compare-and-swap is retried, up to `max_attempts` swaps in total.
    pub async fn increment(&self, name: &str) -> Result<Incremented, RepositoryError> {
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            trace!(name, attempt, "reading");
            let (current, expected) = match self.load(name).await? {
                Some((value, version)) => (value, ExpectedVersion::At(version)),
                None => (0, ExpectedVersion::Absent),
            };

            let next = current.checked_add(1).ok_or(RepositoryError::Overflow { value: current })?;
            let encoded = encode_value(next);

            trace!(name, attempt, ?expected, next, "swapping");
            let outcome = self
                .bounded(
                    name,
                    "compare_and_swap",
                    self.store.compare_and_swap(name, expected, encoded.as_bytes()),
                )
                .await?;

            match outcome {
                CasOutcome::Swapped(version) => {
                    debug!(name, value = next, %version, attempt, "counter incremented");
                    return Ok(Incremented { value: next, version });
                }
                CasOutcome::Conflict { current } => {
                    trace!(name, attempt, ?current, "lost compare-and-swap, retrying");
                    if attempt < max_attempts {
                        self.backoff().await;
                    }
                }
            }
        }

        warn!(name, attempts = max_attempts, "increment gave up under contention");
        Err(RepositoryError::Contention { attempts: max_attempts })
    }

    /// Read and parse `name` together with its version
    async fn load(&self, name: &str) -> Result<Option<(i64, Version)>, RepositoryError> {
        let Some(stored) = self.bounded(name, "get", self.store.get(name)).await? else {
            return Ok(None);
        };

        match decode_value(&stored.value) {
            Some(value) => Ok(Some((value, stored.version))),
            None => {
                let raw = String::from_utf8_lossy(&stored.value).into_owned();
                warn!(name, raw = %raw, "stored counter is not an integer");
                Err(RepositoryError::Corrupt { raw })
            }
        }
    }

    /// Run one store call under the request timeout
    async fn bounded<T>(
        &self,
        name: &str,
        op: &'static str,
        call: impl Future<Output = errors::Result<T>>,
    ) -> Result<T, RepositoryError> {
        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(name, op, %err, "store call failed");
                Err(err.into())
            }
            Err(_) => {
                warn!(name, op, timeout_ms = timeout.as_millis() as u64, "store call timed out");
                Err(RepositoryError::Backend {
                    reason: format!("request timed out after {}ms", timeout.as_millis()),
                })
            }
        }
    }

    /// Jittered pause between conflicting attempts
    async fn backoff(&self) {
        let max = self.config.retry_delay.as_micros() as u64;
        if max == 0 {
            return;
        }
        // Keep the non-Send rng out of the await
        let jitter = rand::rng().random_range(0..=max);
        tokio::time::sleep(Duration::from_micros(jitter)).await;
    }
}
