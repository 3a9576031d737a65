//! # Wanderlust Testing
//!
//! Testing utilities and helpers for Wanderlust reducers.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Property-based testing strategies
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use wanderlust_testing::{mocks::InMemoryStorage, test_clock};
//! use wanderlust_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_add_listing() {
//!     let env = test_environment();
//!     let store = Store::new(AppState::default(), AppReducer::new(), env);
//!
//!     store.send(AppAction::AddListing(draft)).await?;
//!
//!     let count = store.state(|s| s.listings.len()).await;
//!     assert_eq!(count, 1);
//! }
//! ```

use chrono::{DateTime, TimeZone, Utc};
use wanderlust_core::environment::{Clock, IdGenerator, Storage, StorageError};

/// Ergonomic Given-When-Then testing for reducers
pub mod reducer_test;

pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Storage, StorageError, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use wanderlust_testing::mocks::FixedClock;
    /// use wanderlust_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Fixed clock at midnight UTC on the given date
        ///
        /// Falls back to the Unix epoch for an invalid date.
        #[must_use]
        pub fn at_date(year: i32, month: u32, day: u32) -> Self {
            Self::new(
                Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
                    .single()
                    .unwrap_or_default(),
            )
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// At this instant `SAVE50` has expired while `TRAVEL10` and
    /// `FIRSTBOOK20` are still valid.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::at_date(2025, 1, 1)
    }

    /// In-memory [`Storage`] with switchable failures
    #[derive(Debug, Default)]
    pub struct InMemoryStorage {
        entries: Mutex<HashMap<String, String>>,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl InMemoryStorage {
        /// Creates an empty storage
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Builder: pre-populate `key` with a raw value
        #[must_use]
        pub fn with_entry(self, key: &str, value: &str) -> Self {
            self.lock().insert(key.to_string(), value.to_string());
            self
        }

        /// Raw value currently stored under `key`
        #[must_use]
        pub fn entry(&self, key: &str) -> Option<String> {
            self.lock().get(key).cloned()
        }

        /// Make every subsequent `get` fail
        pub fn fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        /// Make every subsequent `set` fail
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
            self.entries.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl Storage for InMemoryStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable(format!("read of `{key}` refused")));
            }
            Ok(self.lock().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable(format!("write of `{key}` refused")));
            }
            self.lock().insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    /// Predictable ids: 1, 2, 3, ...
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Creates a generator whose first id is 1
        #[must_use]
        pub const fn new() -> Self {
            Self::starting_at(1)
        }

        /// Creates a generator whose first id is `first`
        #[must_use]
        pub const fn starting_at(first: u64) -> Self {
            Self {
                next: AtomicU64::new(first),
            }
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> u64 {
            self.next.fetch_add(1, Ordering::SeqCst)
        }
    }
}

/// Property-based testing strategies
///
/// Strategies for the primitive fields of marketplace records. Domain crates
/// combine them into strategies for their own types.
pub mod properties {
    use proptest::prelude::*;

    /// Non-negative prices with cent precision, up to 100 000
    pub fn price() -> impl Strategy<Value = f64> {
        (0_u32..10_000_000).prop_map(|cents| f64::from(cents) / 100.0)
    }

    /// Ratings on the half-star grid in `[0, 5]`
    pub fn rating() -> impl Strategy<Value = f64> {
        (0_u8..=10).prop_map(|halves| f64::from(halves) / 2.0)
    }

    /// Short mixed-case words usable as titles, locations or queries
    pub fn word() -> impl Strategy<Value = String> {
        "[A-Za-z]{1,8}( [A-Za-z]{1,8})?"
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, InMemoryStorage, SequentialIdGenerator};
