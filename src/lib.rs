//! # Tallykv
//!
//! **Linearizable named counters over a versioned key-value store.**
//!
//! Tallykv exposes signed 64-bit counters addressed by name: read one, set it
//! to an arbitrary value, or increment it by one. Increments never lose
//! updates when many callers race on the same counter, because every
//! increment is an optimistic compare-and-swap against the version it read,
//! retried a bounded number of times. There is no in-process lock: the only
//! shared state is the store.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tallykv::Builder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let counters = Builder::new().path("./data").build().await?;
//!
//!     // Lazily created at 1
//!     let hit = counters.increment_counter("visits").await?;
//!     println!("visits = {} (version {})", hit.value, hit.version);
//!
//!     // Overwrite
//!     counters.set_counter("visits", "100").await?;
//!
//!     // Read
//!     assert_eq!(counters.get_counter("visits").await?, 100);
//!
//!     counters.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Bring Your Own Store
//!
//! Anything implementing [`VersionedStore`] (versioned `get`, `put` and
//! `compare_and_swap`) can back the counters, e.g. a client for a consensus
//! backed cluster. Two stores ship with the crate:
//!
//! - [`LocalStore`]: durable, single node, write-ahead logged
//! - [`MemoryStore`]: in memory, for tests and embedding
//!
//! ```
//! use std::sync::Arc;
//!
//! use tallykv::{CounterService, MemoryStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tallykv::CounterError> {
//! let counters = CounterService::new(Arc::new(MemoryStore::new()));
//! counters.increment_counter("jobs").await?;
//! assert_eq!(counters.get_counter("jobs").await?, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns `Result<T, CounterError>`; each variant carries a
//! reason a transport can render, and [`CounterError::kind`] gives a plain
//! discriminant to map onto status codes:
//!
//! ```no_run
//! use tallykv::{Builder, CounterError};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let counters = Builder::new().build().await?;
//!
//! match counters.get_counter("visits").await {
//!     Ok(value) => println!("{value}"),
//!     Err(CounterError::NotFound { name }) => eprintln!("{name} was never set"),
//!     Err(err @ (CounterError::Contention { .. } | CounterError::Unavailable { .. })) => {
//!         eprintln!("try again later: {err}")
//!     }
//!     Err(err) => eprintln!("{err}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - **No lost updates**: concurrent increments of one counter are totally ordered by the store's CAS
//! - **Bounded**: an increment makes at most `max_attempts` swaps, then reports contention
//! - **Bounded waits**: every store call runs under `request_timeout`; a timeout is never read as zero
//! - **No coercion**: a stored value that is not an integer is reported as corrupt and left untouched
//! - **No overflow**: incrementing `i64::MAX` is refused instead of wrapping

#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

pub(crate) mod config;
pub(crate) mod errors;
pub(crate) mod helpers;
pub(crate) mod local;
pub(crate) mod memory;
pub(crate) mod memtable;
pub(crate) mod repository;
pub(crate) mod service;
pub(crate) mod stats;
pub(crate) mod store;
#[cfg(test)]
pub(crate) mod testing;
pub(crate) mod version;
pub(crate) mod wal;

pub use config::{Builder, Config};
pub use errors::{CounterError, ErrorKind, RepositoryError, StoreError};
pub use helpers::MAX_NAME_LEN;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use repository::{CounterRepository, Incremented};
pub use service::CounterService;
pub use stats::Stats;
pub use store::{CasOutcome, VersionedStore, VersionedValue};
pub use version::{ExpectedVersion, Version};
