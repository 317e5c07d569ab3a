use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque token a store assigns to every write of a key.
///
/// Only equality carries meaning for conditional writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version a compare-and-swap expects the key to be at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The key must not exist yet (create-if-missing)
    Absent,
    /// The key must still carry this version
    At(Version),
}

impl ExpectedVersion {
    /// Whether a key currently at `current` satisfies this expectation
    #[inline]
    #[must_use]
    pub fn matches(self, current: Option<Version>) -> bool {
        match (self, current) {
            (ExpectedVersion::Absent, None) => true,
            (ExpectedVersion::At(expected), Some(current)) => expected == current,
            _ => false,
        }
    }
}

/// Store-wide revision counter
pub struct VersionCounter {
    counter: AtomicU64,
}

impl VersionCounter {
    /// Create new version counter starting at version 1
    pub fn new() -> Self {
        Self { counter: AtomicU64::new(1) }
    }

    /// Get next version number (monotonically increasing)
    pub fn next_version(&self) -> Version {
        Version(self.counter.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the version the next write will receive
    pub fn current_version(&self) -> Version {
        Version(self.counter.load(Ordering::SeqCst))
    }

    /// Move the counter past `seen` so recovered versions are never reissued
    pub fn advance_past(&self, seen: Version) {
        self.counter.fetch_max(seen.0 + 1, Ordering::SeqCst);
    }
}

impl Default for VersionCounter {
    fn default() -> Self {
        Self::new()
    }
}
