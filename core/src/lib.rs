//! # Wanderlust Core
//!
//! Core traits and types for the Wanderlust marketplace state machine.
//!
//! The marketplace is modelled as a single reducer over one application
//! state. Everything that touches the outside world (durable storage, the
//! wall clock, id generation, timers) is either injected through the
//! environment or described as an [`Effect`](effect::Effect) for the runtime
//! to execute.
//!
//! ## Core Concepts
//!
//! - **State**: The one application state for a running session
//! - **Action**: Every input to the reducer (UI intents, timer callbacks)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (persistence, delays, cancellation)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```ignore
//! use wanderlust_core::*;
//!
//! impl Reducer for AppReducer {
//!     type State = AppState;
//!     type Action = AppAction;
//!     type Environment = AppEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut AppState,
//!         action: AppAction,
//!         env: &AppEnvironment,
//!     ) -> SmallVec<[Effect<AppAction>; 4]> {
//!         // Business logic goes here
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for AppReducer {
    ///     type State = AppState;
    ///     type Action = AppAction;
    ///     type Environment = AppEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut AppState,
    ///         action: AppAction,
    ///         env: &AppEnvironment,
    ///     ) -> SmallVec<[Effect<AppAction>; 4]> {
    ///         match action {
    ///             AppAction::SetSearchQuery(query) => {
    ///                 state.search_query = query;
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Updates state in place and returns effect descriptions for the
        /// runtime. Must not perform I/O itself.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and can be made cancellable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identifier used to cancel an in-flight effect
    ///
    /// Ids are static names; one feature usually owns a handful of them
    /// (for example the pending coupon check).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EffectId(&'static str);

    impl EffectId {
        /// Creates a new effect id
        #[must_use]
        pub const fn new(name: &'static str) -> Self {
            Self(name)
        }

        /// Returns the name of this id
        #[must_use]
        pub const fn name(&self) -> &'static str {
            self.0
        }
    }

    impl std::fmt::Display for EffectId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Delayed action (timers)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run `effect` so that it can later be stopped with [`Effect::Cancel`]
        ///
        /// Starting a cancellable effect replaces any in-flight effect with the same id.
        Cancellable {
            /// Cancellation key
            id: EffectId,
            /// The wrapped effect
            effect: Box<Effect<Action>>,
        },

        /// Cancel every in-flight effect registered under the id
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Dispatch `action` after `duration`
        #[must_use]
        pub fn delay(duration: Duration, action: Action) -> Effect<Action> {
            Effect::Delay {
                duration,
                action: Box::new(action),
            }
        }

        /// Make this effect cancellable under `id`
        #[must_use]
        pub fn cancellable(self, id: EffectId) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(self),
            }
        }

        /// Returns true for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};
    use thiserror::Error;

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Errors raised by a [`Storage`] backend
    #[derive(Error, Debug)]
    pub enum StorageError {
        /// Reading or writing the backing medium failed
        #[error("storage I/O failed for key `{key}`: {source}")]
        Io {
            /// Key being accessed
            key: String,
            /// Underlying error
            #[source]
            source: std::io::Error,
        },

        /// The backend refused the operation
        #[error("storage unavailable: {0}")]
        Unavailable(String),
    }

    /// Durable string-keyed storage
    ///
    /// Values are opaque strings; callers serialize to JSON before writing.
    /// A missing key is `Ok(None)`, not an error.
    pub trait Storage: Send + Sync {
        /// Read the value stored under `key`
        ///
        /// # Errors
        ///
        /// Returns [`StorageError`] if the backend cannot be read.
        fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

        /// Store `value` under `key`, replacing any previous value
        ///
        /// # Errors
        ///
        /// Returns [`StorageError`] if the backend cannot be written.
        fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    }

    /// Source of fresh listing identifiers
    pub trait IdGenerator: Send + Sync {
        /// Returns an id never handed out before by this generator
        fn next_id(&self) -> u64;
    }

    /// Millisecond-timestamp ids, strictly increasing within a process
    #[derive(Debug, Default)]
    pub struct SystemIdGenerator {
        last: AtomicU64,
    }

    impl SystemIdGenerator {
        /// Creates a new generator
        #[must_use]
        pub const fn new() -> Self {
            Self {
                last: AtomicU64::new(0),
            }
        }
    }

    impl IdGenerator for SystemIdGenerator {
        fn next_id(&self) -> u64 {
            let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
            let mut current = self.last.load(Ordering::Relaxed);
            loop {
                let candidate = now.max(current + 1);
                match self.last.compare_exchange_weak(
                    current,
                    candidate,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return candidate,
                    Err(observed) => current = observed,
                }
            }
        }
    }
}
