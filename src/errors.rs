use std::borrow::Cow;
use std::{io, result};

use thiserror::Error;

/// Faults raised by a [`VersionedStore`](crate::VersionedStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Data corruption: {0}")]
    Corruption(Cow<'static, str>),
    #[error("Invalid data: {0}")]
    InvalidData(Cow<'static, str>),
    #[error("Store is closed")]
    Closed,
}

pub type Result<T> = result::Result<T, StoreError>;

/// Outcomes of [`CounterRepository`](crate::CounterRepository) that are not a committed value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// Stored bytes are not a decimal `i64`
    #[error("stored value {raw:?} is not a valid integer")]
    Corrupt { raw: String },

    /// Increment would pass `i64::MAX`
    #[error("incrementing {value} would overflow")]
    Overflow { value: i64 },

    /// Every CAS attempt lost to a concurrent writer
    #[error("gave up after {attempts} conflicting attempts")]
    Contention { attempts: u32 },

    /// Store error, timeout or closed store
    #[error("{reason}")]
    Backend { reason: String },
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        RepositoryError::Backend { reason: err.to_string() }
    }
}

/// Fieldless discriminant of [`CounterError`], for transports mapping outcomes to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Invalid,
    NotFound,
    Corrupt,
    Contention,
    Overflow,
    Unavailable,
}

/// Every non-success outcome of [`CounterService`](crate::CounterService).
///
/// The `Display` form of each variant is the reason text a transport renders.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CounterError {
    /// Caller input is malformed; never retried.
    #[error("invalid request: {reason}")]
    Invalid { reason: String },

    /// The counter has never been written.
    #[error("counter '{name}' not found")]
    NotFound { name: String },

    /// The stored value was not written by this protocol.
    #[error("counter '{name}' holds corrupt value {raw:?}")]
    Corrupt { name: String, raw: String },

    /// Optimistic retries exhausted under concurrent writers.
    #[error("counter '{name}' is contended: gave up after {attempts} attempts")]
    Contention { name: String, attempts: u32 },

    /// Increment would exceed the representable range.
    #[error("counter '{name}' would overflow past {value}")]
    Overflow { name: String, value: i64 },

    /// The backing store failed, timed out or is closed.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl CounterError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CounterError::Invalid { reason: reason.into() }
    }

    /// Maps a repository outcome for the counter `name`.
    pub(crate) fn from_repository(name: &str, err: RepositoryError) -> Self {
        match err {
            RepositoryError::Corrupt { raw } => CounterError::Corrupt { name: name.into(), raw },
            RepositoryError::Overflow { value } => {
                CounterError::Overflow { name: name.into(), value }
            }
            RepositoryError::Contention { attempts } => {
                CounterError::Contention { name: name.into(), attempts }
            }
            RepositoryError::Backend { reason } => CounterError::Unavailable { reason },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CounterError::Invalid { .. } => ErrorKind::Invalid,
            CounterError::NotFound { .. } => ErrorKind::NotFound,
            CounterError::Corrupt { .. } => ErrorKind::Corrupt,
            CounterError::Contention { .. } => ErrorKind::Contention,
            CounterError::Overflow { .. } => ErrorKind::Overflow,
            CounterError::Unavailable { .. } => ErrorKind::Unavailable,
        }
    }

    /// Whether repeating the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, CounterError::Contention { .. } | CounterError::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_mapping() {
        let err = CounterError::from_repository(
            "hits",
            RepositoryError::Contention { attempts: 10 },
        );
        assert_eq!(err, CounterError::Contention { name: "hits".into(), attempts: 10 });
        assert!(err.is_retryable());

        let err = CounterError::from_repository(
            "hits",
            RepositoryError::Backend { reason: "request timed out after 5ms".into() },
        );
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(err.to_string(), "store unavailable: request timed out after 5ms");

        let err = CounterError::from_repository("hits", RepositoryError::Overflow { value: i64::MAX });
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_store_error_becomes_backend() {
        let err: RepositoryError = StoreError::Closed.into();
        assert_eq!(err, RepositoryError::Backend { reason: "Store is closed".into() });
    }
}
