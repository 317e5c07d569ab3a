use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{Result, StoreError};
use crate::helpers::{
    DB_PATH, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_DELAY,
};
use crate::local::LocalStore;
use crate::service::CounterService;

/// Tuning for counter operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Compare-and-swap attempts an increment makes before reporting contention (default: 10)
    pub max_attempts: u32,

    /// Upper bound on every single store call (default: 5s)
    pub request_timeout: Duration,

    /// Upper bound of the random pause between conflicting attempts (default: 1ms)
    pub retry_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl Config {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(StoreError::InvalidData("max_attempts must be greater than 0".into()));
        }

        if self.request_timeout.is_zero() {
            return Err(StoreError::InvalidData(
                "request_timeout must be greater than 0".into(),
            ));
        }

        if self.retry_delay >= self.request_timeout {
            return Err(StoreError::InvalidData(
                "retry_delay should be shorter than request_timeout".into(),
            ));
        }

        Ok(())
    }
}

/// Builder for a [`CounterService`] over a durable [`LocalStore`].
///
/// # Examples
///
///```no_run
/// use std::time::Duration;
///
/// use tallykv::Builder;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let counters = Builder::new()
///         .path("./data")
///         .max_attempts(20)
///         .request_timeout(Duration::from_secs(2))
///         .build()
///         .await?;
///
///     counters.increment_counter("visits").await?;
///     counters.close().await?;
///     Ok(())
/// }
/// ```
pub struct Builder {
    path: Option<PathBuf>,
    config: Config,
}

impl Default for Builder {
    fn default() -> Self {
        Self { path: Some(DB_PATH.into()), config: Config::default() }
    }
}

impl Builder {
    /// Creates a new [`Builder`] instance with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store directory path.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set how many compare-and-swap attempts an increment may make.
    ///
    /// Higher values ride out heavier write contention on a single counter
    /// at the cost of longer worst-case latency.
    ///
    /// **NOTE**: The least minimum value is 1 and default is 10.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the timeout applied to each individual store call.
    ///
    /// A call that exceeds it is reported as unavailable, never as a missing counter.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the upper bound of the jittered pause between conflicting attempts.
    ///
    /// **NOTE**: Zero disables the pause.
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Open the store and return a service over it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path was not set
    /// - The configuration is invalid
    /// - The store directory cannot be created
    /// - WAL recovery fails
    pub async fn build(self) -> Result<CounterService<LocalStore>> {
        let path =
            self.path.ok_or_else(|| StoreError::InvalidData("Store path not set".into()))?;

        self.config.validate()?;

        let store = LocalStore::open(path).await?;
        Ok(CounterService::with_config(Arc::new(store), self.config))
    }
}
