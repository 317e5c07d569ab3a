use std::sync::Arc;

use tracing::instrument;

use crate::config::Config;
use crate::errors::CounterError;
use crate::helpers::MAX_NAME_LEN;
use crate::repository::{CounterRepository, Incremented};
use crate::store::VersionedStore;
use crate::version::Version;

/// Transport-facing counter operations.
///
/// Inputs are validated before any store call, and every failure comes back
/// as one [`CounterError`] variant. Cloning is cheap; clones share the store.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use tallykv::{CounterError, CounterService, MemoryStore};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let counters = CounterService::new(Arc::new(MemoryStore::new()));
///
/// assert!(matches!(counters.get_counter("visits").await, Err(CounterError::NotFound { .. })));
/// assert_eq!(counters.increment_counter("visits").await?.value, 1);
///
/// counters.set_counter("visits", "41").await?;
/// assert_eq!(counters.increment_counter("visits").await?.value, 42);
/// # Ok(())
/// # }
/// ```
pub struct CounterService<S> {
    repository: CounterRepository<S>,
}

impl<S> Clone for CounterService<S> {
    fn clone(&self) -> Self {
        Self { repository: self.repository.clone() }
    }
}

impl<S: VersionedStore> CounterService<S> {
    /// Service over `store` with the default [`Config`]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(store: Arc<S>, config: Config) -> Self {
        Self { repository: CounterRepository::new(store, config) }
    }

    pub fn config(&self) -> &Config {
        self.repository.config()
    }

    pub fn store(&self) -> &Arc<S> {
        self.repository.store()
    }

    /// Current value of the counter `name`.
    ///
    /// A counter that was never written is [`CounterError::NotFound`], never zero.
    #[instrument(level = "trace", skip(self))]
    pub async fn get_counter(&self, name: &str) -> Result<i64, CounterError> {
        validate_name(name)?;

        match self.repository.read(name).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(CounterError::NotFound { name: name.into() }),
            Err(err) => Err(CounterError::from_repository(name, err)),
        }
    }

    /// Set the counter `name` to the integer spelled by `raw`.
    ///
    /// `raw` follows Rust integer syntax: an optional sign followed by ASCII
    /// digits, no surrounding whitespace. The canonical form is persisted.
    #[instrument(level = "trace", skip(self))]
    pub async fn set_counter(&self, name: &str, raw: &str) -> Result<Version, CounterError> {
        validate_name(name)?;
        let value: i64 = raw
            .parse()
            .map_err(|err| CounterError::invalid(format!("value {raw:?} is not an integer: {err}")))?;

        self.repository
            .write(name, value)
            .await
            .map_err(|err| CounterError::from_repository(name, err))
    }

    /// Add one to the counter `name`, creating it at 1 if it was never written.
    #[instrument(level = "trace", skip(self))]
    pub async fn increment_counter(&self, name: &str) -> Result<Incremented, CounterError> {
        validate_name(name)?;

        self.repository
            .increment(name)
            .await
            .map_err(|err| CounterError::from_repository(name, err))
    }

    /// Close the underlying store. Later calls report [`CounterError::Unavailable`].
    pub async fn close(&self) -> Result<(), CounterError> {
        self.repository
            .store()
            .close()
            .await
            .map_err(|err| CounterError::Unavailable { reason: err.to_string() })
    }
}

fn validate_name(name: &str) -> Result<(), CounterError> {
    if name.trim().is_empty() {
        return Err(CounterError::invalid("counter name must not be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(CounterError::invalid(format!(
            "counter name is {} bytes, limit is {MAX_NAME_LEN}",
            name.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::errors::ErrorKind;
    use crate::memory::MemoryStore;
    use crate::testing::{ConflictingStore, CountingStore, FailingStore};

    fn counting() -> CounterService<CountingStore<MemoryStore>> {
        CounterService::new(Arc::new(CountingStore::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn test_invalid_names_never_reach_store() {
        let service = counting();

        for name in ["", "   ", "\t\n"] {
            assert_eq!(service.get_counter(name).await.unwrap_err().kind(), ErrorKind::Invalid);
            assert_eq!(service.set_counter(name, "5").await.unwrap_err().kind(), ErrorKind::Invalid);
            assert_eq!(service.increment_counter(name).await.unwrap_err().kind(), ErrorKind::Invalid);
        }

        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert_eq!(service.get_counter(&long).await.unwrap_err().kind(), ErrorKind::Invalid);

        assert_eq!(service.store().total_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_value_never_reaches_store() {
        let service = counting();

        for raw in ["", "abc", "1.5", " 5", "5 ", "9223372036854775808", "0x10"] {
            let err = service.set_counter("hits", raw).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Invalid, "{raw:?} must be rejected");
            assert!(err.to_string().contains(&format!("{raw:?}")));
        }

        assert_eq!(service.store().total_calls(), 0);
    }

    #[tokio::test]
    async fn test_get_never_set_is_not_found() {
        let service = counting();
        assert_eq!(
            service.get_counter("ghost").await,
            Err(CounterError::NotFound { name: "ghost".into() })
        );
    }

    #[tokio::test]
    async fn test_set_is_idempotent_in_value() {
        let service = counting();

        let v1 = service.set_counter("hits", "5").await.unwrap();
        assert_eq!(service.get_counter("hits").await, Ok(5));

        let v2 = service.set_counter("hits", "5").await.unwrap();
        assert_eq!(service.get_counter("hits").await, Ok(5));
        assert_ne!(v1, v2);
    }

    #[tokio::test]
    async fn test_set_round_trips_exactly() {
        let service = counting();

        for raw in ["0", "-0", "+7", "007", "-42", "9223372036854775807", "-9223372036854775808"] {
            service.set_counter("n", raw).await.unwrap();
            assert_eq!(service.get_counter("n").await, Ok(raw.parse::<i64>().unwrap()));
        }
    }

    #[tokio::test]
    async fn test_set_persists_canonical_text() {
        let service = counting();
        service.set_counter("n", "+007").await.unwrap();

        let stored = service.store().get("n").await.unwrap().unwrap();
        assert_eq!(&*stored.value, b"7");
    }

    #[tokio::test]
    async fn test_increment_lazily_creates() {
        let service = counting();

        let first = service.increment_counter("fresh").await.unwrap();
        assert_eq!(first.value, 1);
        assert_eq!(service.get_counter("fresh").await, Ok(1));
    }

    #[tokio::test]
    async fn test_corrupt_value_surfaces_on_get_and_increment() {
        let service = counting();
        service.store().put("bad", b"abc").await.unwrap();

        let expected = CounterError::Corrupt { name: "bad".into(), raw: "abc".into() };
        assert_eq!(service.get_counter("bad").await, Err(expected.clone()));
        assert_eq!(service.increment_counter("bad").await, Err(expected));
    }

    #[tokio::test]
    async fn test_contention_and_overflow_outcomes() {
        let config = Config { max_attempts: 3, retry_delay: Duration::ZERO, ..Config::default() };
        let service = CounterService::with_config(Arc::new(ConflictingStore::default()), config);
        assert_eq!(
            service.increment_counter("hot").await,
            Err(CounterError::Contention { name: "hot".into(), attempts: 3 })
        );

        let service = counting();
        service.set_counter("max", &i64::MAX.to_string()).await.unwrap();
        assert_eq!(
            service.increment_counter("max").await,
            Err(CounterError::Overflow { name: "max".into(), value: i64::MAX })
        );
    }

    #[tokio::test]
    async fn test_backend_failure_is_unavailable() {
        let service = CounterService::new(Arc::new(FailingStore));

        assert_eq!(service.get_counter("hits").await.unwrap_err().kind(), ErrorKind::Unavailable);
        assert_eq!(service.set_counter("hits", "1").await.unwrap_err().kind(), ErrorKind::Unavailable);
        let err = service.increment_counter("hits").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.to_string().contains("backend unreachable"));
    }

    #[tokio::test]
    async fn test_service_over_trait_object() {
        let store: Arc<dyn VersionedStore> = Arc::new(MemoryStore::new());
        let service = CounterService::new(Arc::new(store));

        service.increment_counter("hits").await.unwrap();
        service.increment_counter("hits").await.unwrap();
        assert_eq!(service.get_counter("hits").await, Ok(2));
    }
}
