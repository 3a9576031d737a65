//! # Wanderlust Runtime
//!
//! The [`Store`] holds the single application state for a session, runs the
//! reducer for every action and executes the effects it returns.
//!
//! ## Core Components
//!
//! - **Store**: Manages state and executes effects
//! - **Effect Executor**: Spawns timers and futures, feeds produced actions back
//! - **Cancellation registry**: Aborts in-flight effects by [`EffectId`]
//!
//! ## Example
//!
//! ```ignore
//! use wanderlust_runtime::Store;
//!
//! let store = Store::new(initial_state, AppReducer::new(), environment);
//!
//! // Send an action
//! store.send(AppAction::SetSearchQuery("goa".into())).await?;
//!
//! // Read state
//! let query = store.state(|s| s.search_query.clone()).await;
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use wanderlust_core::effect::{Effect, EffectId};
use wanderlust_core::reducer::Reducer;

/// Metric names recorded by the store
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects started by
/// that action. Effects started by actions fed back later are not included.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(AppAction::SelectCoupon { code }).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Built before spawning so that aborting a task that never ran still
/// releases its slot.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::metrics as names;
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectId, EffectTracking, Ordering, Reducer, RwLock, StoreError,
    };
    use std::collections::HashMap;
    use std::sync::{Mutex, PoisonError};
    use tokio::sync::broadcast;
    use tokio::task::AbortHandle;

    type CancelRegistry = Arc<Mutex<HashMap<EffectId, Vec<AbortHandle>>>>;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; the reducer runs under the write lock)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop and cancellation)
    ///
    /// Cloning a store is cheap and every clone shares the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        cancellations: CancelRegistry,
        /// Actions produced by effects, for observers
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + Sync + Clone + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            let (action_broadcast, _) = broadcast::channel(16);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                cancellations: Arc::new(Mutex::new(HashMap::new())),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Starts the returned effects
        ///
        /// `send()` returns once the state has been updated; effects may
        /// still be running. Use the returned handle to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!(names::SHUTDOWN_REJECTED).increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!(names::COMMANDS_TOTAL).increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!(names::REDUCER_DURATION)
                    .record(start.elapsed().as_secs_f64());

                // Note: Precision loss acceptable for metrics (effect counts < 2^52)
                #[allow(clippy::cast_precision_loss)]
                metrics::histogram!(names::EFFECTS_COUNT).record(effects.len() as f64);

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect(effect, &tracking, None);
            }

            Ok(handle)
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.listings.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Subscribe to actions produced by effects
        ///
        /// Actions passed directly to [`send`](Self::send) are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Stop accepting actions and wait for running effects to finish
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
        /// when `timeout` elapses.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Abort every in-flight effect registered under `id`
        fn cancel(&self, id: EffectId) {
            let handles = self
                .cancellations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id)
                .unwrap_or_default();

            let live: Vec<_> = handles.into_iter().filter(|h| !h.is_finished()).collect();
            if !live.is_empty() {
                tracing::debug!(
                    effect_id = %id,
                    count = live.len(),
                    "Cancelling in-flight effects"
                );
                metrics::counter!(names::EFFECTS_CANCELLED).increment(live.len() as u64);
            }
            for handle in live {
                handle.abort();
            }
        }

        fn register(&self, id: EffectId, handle: AbortHandle) {
            let mut registry = self
                .cancellations
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let handles = registry.entry(id).or_default();
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
        }

        /// Guards for one spawned effect: the handle counter and the
        /// store-wide pending counter.
        fn guards(&self, tracking: &EffectTracking) -> (DecrementGuard, AtomicCounterGuard) {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            (
                DecrementGuard(tracking.clone()),
                AtomicCounterGuard(Arc::clone(&self.pending_effects)),
            )
        }

        /// Feed an action produced by an effect back into the store
        async fn feedback(&self, action: A) {
            let _ = self.action_broadcast.send(action.clone());
            if let Err(error) = self.send(action).await {
                tracing::debug!(%error, "Dropped action produced by effect");
            }
        }

        /// Execute an effect
        ///
        /// `scope` is the id of the enclosing `Effect::Cancellable`, if any;
        /// every task spawned under it is registered for cancellation.
        fn execute_effect(
            &self,
            effect: Effect<A>,
            tracking: &EffectTracking,
            scope: Option<EffectId>,
        ) {
            match effect {
                Effect::None => {
                    metrics::counter!(names::EFFECTS_EXECUTED, "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!(names::EFFECTS_EXECUTED, "type" => "future").increment(1);
                    let guards = self.guards(tracking);
                    let store = self.clone();

                    let task = tokio::spawn(async move {
                        let _guards = guards;
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action");
                            store.feedback(action).await;
                        }
                    });
                    if let Some(id) = scope {
                        self.register(id, task.abort_handle());
                    }
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    metrics::counter!(names::EFFECTS_EXECUTED, "type" => "delay").increment(1);
                    let guards = self.guards(tracking);
                    let store = self.clone();

                    let task = tokio::spawn(async move {
                        let _guards = guards;
                        tokio::time::sleep(duration).await;
                        store.feedback(*action).await;
                    });
                    if let Some(id) = scope {
                        self.register(id, task.abort_handle());
                    }
                },
                Effect::Cancellable { id, effect } => {
                    metrics::counter!(names::EFFECTS_EXECUTED, "type" => "cancellable")
                        .increment(1);
                    self.cancel(id);
                    self.execute_effect(*effect, tracking, Some(id));
                },
                Effect::Cancel(id) => {
                    metrics::counter!(names::EFFECTS_EXECUTED, "type" => "cancel").increment(1);
                    self.cancel(id);
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                cancellations: Arc::clone(&self.cancellations),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use wanderlust_core::{smallvec, SmallVec};

    const TIMER: EffectId = EffectId::new("timer");

    #[derive(Debug, Clone)]
    struct TestState {
        value: i32,
    }

    #[derive(Debug, Clone)]
    enum TestAction {
        Increment,
        Decrement,
        ProduceFuture,
        ProduceDelayed,
        StartTimer,
        StopTimer,
    }

    #[derive(Debug, Clone)]
    struct TestEnv;

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    SmallVec::new()
                },
                TestAction::Decrement => {
                    state.value -= 1;
                    SmallVec::new()
                },
                TestAction::ProduceFuture => {
                    smallvec![Effect::Future(Box::pin(async { Some(TestAction::Increment) }))]
                },
                TestAction::ProduceDelayed => {
                    smallvec![Effect::delay(Duration::from_millis(10), TestAction::Increment)]
                },
                TestAction::StartTimer => smallvec![
                    Effect::delay(Duration::from_millis(50), TestAction::Increment)
                        .cancellable(TIMER)
                ],
                TestAction::StopTimer => smallvec![Effect::Cancel(TIMER)],
            }
        }
    }

    fn store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(TestState { value: 0 }, TestReducer, TestEnv)
    }

    #[tokio::test]
    async fn test_send_action() {
        let store = store();

        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Decrement).await;

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_future_effect_feeds_back() {
        let store = store();

        let mut handle = store.send(TestAction::ProduceFuture).await.unwrap();
        assert!(handle.wait_with_timeout(Duration::from_secs(1)).await.is_ok());

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_delayed_action() {
        let store = store();
        let mut observed = store.subscribe_actions();

        let mut handle = store.send(TestAction::ProduceDelayed).await.unwrap();
        assert_eq!(handle.pending(), 1);
        assert_eq!(store.state(|s| s.value).await, 0);
        assert!(handle.wait_with_timeout(Duration::from_secs(1)).await.is_ok());
        assert_eq!(handle.pending(), 0);

        assert_eq!(store.state(|s| s.value).await, 1);
        assert!(matches!(observed.recv().await, Ok(TestAction::Increment)));
    }

    #[tokio::test]
    async fn test_cancel_stops_pending_timer() {
        let store = store();

        let mut handle = store.send(TestAction::StartTimer).await.unwrap();
        let _ = store.send(TestAction::StopTimer).await;

        assert!(handle.wait_with_timeout(Duration::from_secs(1)).await.is_ok());
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_restarting_cancellable_replaces_in_flight() {
        let store = store();

        let _ = store.send(TestAction::StartTimer).await;
        let mut second = store.send(TestAction::StartTimer).await.unwrap();
        assert!(second.wait_with_timeout(Duration::from_secs(1)).await.is_ok());
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_actions() {
        let store = store();

        let _ = store.send(TestAction::ProduceDelayed).await;
        assert!(store.shutdown(Duration::from_secs(1)).await.is_ok());

        let result = store.send(TestAction::Increment).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }
}
