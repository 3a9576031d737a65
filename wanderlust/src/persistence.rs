//! Durable storage of listings and the session.
//!
//! Three independent keys hold JSON values:
//!
//! | key | value |
//! |---|---|
//! | `listings` | array of [`Listing`] |
//! | `isLoggedIn` | boolean |
//! | `userDetails` | array of [`User`] |
//!
//! Loading never fails: missing, `null` or malformed values fall back to an
//! empty default and are logged. Saving is best-effort; failures are logged
//! and swallowed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use wanderlust_core::environment::{Storage, StorageError};

use crate::types::{AppState, Listing, User};

/// Storage key of the listings array
pub const LISTINGS_KEY: &str = "listings";
/// Storage key of the signed-in flag
pub const LOGGED_IN_KEY: &str = "isLoggedIn";
/// Storage key of the user list
pub const USERS_KEY: &str = "userDetails";

fn read_or_default<T>(storage: &dyn Storage, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(error) => {
            tracing::error!(key, %error, "Failed to read from storage");
            return T::default();
        },
    };

    match serde_json::from_str::<Option<T>>(&raw) {
        Ok(value) => value.unwrap_or_default(),
        Err(error) => {
            tracing::error!(key, %error, "Failed to parse stored value");
            T::default()
        },
    }
}

fn write<T>(storage: &dyn Storage, key: &str, value: &T) -> bool
where
    T: Serialize + ?Sized,
{
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(error) => {
            tracing::error!(key, %error, "Failed to serialize value");
            return false;
        },
    };

    match storage.set(key, &json) {
        Ok(()) => true,
        Err(error) => {
            tracing::error!(key, %error, "Failed to write to storage");
            false
        },
    }
}

/// Loads and saves the listings array
#[derive(Clone, Copy)]
pub struct ListingStore<'a> {
    storage: &'a dyn Storage,
}

impl<'a> ListingStore<'a> {
    /// Creates a store over `storage`
    #[must_use]
    pub const fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Stored listings, or an empty list if none can be read
    #[must_use]
    pub fn load(&self) -> Vec<Listing> {
        read_or_default(self.storage, LISTINGS_KEY)
    }

    /// Writes `listings`, returning whether the write succeeded
    pub fn save(&self, listings: &[Listing]) -> bool {
        write(self.storage, LISTINGS_KEY, listings)
    }
}

/// Loads and saves the signed-in flag and the user list
#[derive(Clone, Copy)]
pub struct SessionStore<'a> {
    storage: &'a dyn Storage,
}

impl<'a> SessionStore<'a> {
    /// Creates a store over `storage`
    #[must_use]
    pub const fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Stored flag, `false` if none can be read
    #[must_use]
    pub fn load_logged_in(&self) -> bool {
        read_or_default(self.storage, LOGGED_IN_KEY)
    }

    /// Writes the signed-in flag
    pub fn save_logged_in(&self, is_logged_in: bool) -> bool {
        write(self.storage, LOGGED_IN_KEY, &is_logged_in)
    }

    /// Stored users, or an empty list if none can be read
    #[must_use]
    pub fn load_users(&self) -> Vec<User> {
        read_or_default(self.storage, USERS_KEY)
    }

    /// Writes the user list
    pub fn save_users(&self, users: &[User]) -> bool {
        write(self.storage, USERS_KEY, users)
    }
}

/// The persisted slices of [`AppState`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PersistedState {
    /// All listings
    pub listings: Vec<Listing>,
    /// Signed-in flag
    pub is_logged_in: bool,
    /// Registered users
    pub users: Vec<User>,
}

impl PersistedState {
    /// Copies the persisted slices out of `state`
    #[must_use]
    pub fn from_state(state: &AppState) -> Self {
        Self {
            listings: state.listings.clone(),
            is_logged_in: state.is_logged_in,
            users: state.users.clone(),
        }
    }

    /// Reads all three keys
    #[must_use]
    pub fn load(storage: &dyn Storage) -> Self {
        let session = SessionStore::new(storage);
        Self {
            listings: ListingStore::new(storage).load(),
            is_logged_in: session.load_logged_in(),
            users: session.load_users(),
        }
    }

    /// Writes all three keys, returning whether every write succeeded
    pub fn save(&self, storage: &dyn Storage) -> bool {
        let session = SessionStore::new(storage);
        let listings = ListingStore::new(storage).save(&self.listings);
        let logged_in = session.save_logged_in(self.is_logged_in);
        let users = session.save_users(&self.users);
        listings && logged_in && users
    }

    /// A fresh session state holding these slices
    #[must_use]
    pub fn into_state(self) -> AppState {
        AppState {
            listings: self.listings,
            is_logged_in: self.is_logged_in,
            users: self.users,
            ..AppState::default()
        }
    }
}

/// Orders snapshot writes issued by concurrently running effects
///
/// Every snapshot takes a generation when it is staged; a write is skipped
/// if a newer generation has already been committed.
#[derive(Debug, Default)]
pub struct WriteSequence {
    issued: AtomicU64,
    committed: Mutex<u64>,
}

impl WriteSequence {
    /// Creates a sequence with nothing issued
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next generation
    pub fn next(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Runs `write` unless `generation` is older than the last commit
    ///
    /// Returns whether `write` ran.
    pub fn commit(&self, generation: u64, write: impl FnOnce()) -> bool {
        let mut committed = self
            .committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if generation <= *committed {
            tracing::debug!(generation, committed = *committed, "Skipping stale snapshot");
            return false;
        }
        write();
        *committed = generation;
        true
    }
}

/// [`Storage`] backed by one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Stores files under `dir`, creating it on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_error = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_error)?;

        // Write then rename so readers never see a half-written file
        let target = self.path(key);
        let staging = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&staging, value).map_err(io_error)?;
        std::fs::rename(&staging, &target).map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ListingId;
    use wanderlust_testing::InMemoryStorage;

    fn listing(id: u64) -> Listing {
        Listing::new(ListingId::new(id), "Sea View", "Goa", 100.0, 4.0)
    }

    #[test]
    fn missing_keys_load_defaults() {
        let storage = InMemoryStorage::new();
        assert_eq!(PersistedState::load(&storage), PersistedState::default());
    }

    #[test]
    fn null_and_malformed_values_load_defaults() {
        let storage = InMemoryStorage::new()
            .with_entry(LISTINGS_KEY, "{not json")
            .with_entry(LOGGED_IN_KEY, "null")
            .with_entry(USERS_KEY, r#"[{"email": 3}]"#);

        let loaded = PersistedState::load(&storage);
        assert!(loaded.listings.is_empty());
        assert!(!loaded.is_logged_in);
        assert!(loaded.users.is_empty());
    }

    #[test]
    fn unreadable_storage_loads_defaults() {
        let storage = InMemoryStorage::new().with_entry(LOGGED_IN_KEY, "true");
        storage.fail_reads(true);
        assert!(!SessionStore::new(&storage).load_logged_in());
    }

    #[test]
    fn save_writes_all_three_keys() {
        let storage = InMemoryStorage::new();
        let state = PersistedState {
            listings: vec![listing(1)],
            is_logged_in: true,
            users: vec![User::new("a@b.c", "pw")],
        };

        assert!(state.save(&storage));
        assert_eq!(storage.entry(LOGGED_IN_KEY).as_deref(), Some("true"));
        assert_eq!(
            storage.entry(USERS_KEY).as_deref(),
            Some(r#"[{"email":"a@b.c","password":"pw"}]"#)
        );
        assert_eq!(PersistedState::load(&storage), state);
    }

    #[test]
    fn failed_writes_are_reported_not_raised() {
        let storage = InMemoryStorage::new();
        storage.fail_writes(true);
        assert!(!ListingStore::new(&storage).save(&[listing(1)]));
    }

    #[test]
    fn stale_generations_are_skipped() {
        let sequence = WriteSequence::new();
        let first = sequence.next();
        let second = sequence.next();

        let mut writes = Vec::new();
        assert!(sequence.commit(second, || writes.push(second)));
        assert!(!sequence.commit(first, || writes.push(first)));
        assert_eq!(writes, vec![second]);
    }

    #[test]
    fn file_storage_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("data"));

        assert_eq!(storage.get(LISTINGS_KEY).unwrap(), None);
        storage.set(LISTINGS_KEY, "[]").unwrap();
        assert_eq!(storage.get(LISTINGS_KEY).unwrap().as_deref(), Some("[]"));
        assert!(storage.dir().join("listings.json").exists());
    }
}
