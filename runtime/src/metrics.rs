//! Metric names and descriptions recorded by the store.
//!
//! The store only records through the `metrics` facade. Installing a recorder
//! (and exporting it anywhere) is left to the host; without one every call is
//! a no-op.

use metrics::{describe_counter, describe_histogram, Unit};

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Actions accepted by [`Store::send`](crate::Store::send)
pub const COMMANDS_TOTAL: &str = "store.commands.total";
/// Effects executed, labelled by `type`
pub const EFFECTS_EXECUTED: &str = "store.effects.executed";
/// In-flight effects aborted through `Effect::Cancel` or replacement
pub const EFFECTS_CANCELLED: &str = "store.effects.cancelled";
/// Number of effects returned per reducer call
pub const EFFECTS_COUNT: &str = "store.effects.count";
/// Wall time spent inside the reducer
pub const REDUCER_DURATION: &str = "store.reducer.duration_seconds";
/// Actions rejected because the store was shutting down
pub const SHUTDOWN_REJECTED: &str = "store.shutdown.rejected_actions";

/// Register descriptions for every store metric.
///
/// Call once after installing a recorder.
pub fn describe() {
    describe_counter!(COMMANDS_TOTAL, "Actions dispatched into the store");
    describe_counter!(EFFECTS_EXECUTED, "Effects executed by type");
    describe_counter!(EFFECTS_CANCELLED, "In-flight effects aborted");
    describe_histogram!(EFFECTS_COUNT, "Effects returned per reducer call");
    describe_histogram!(REDUCER_DURATION, Unit::Seconds, "Reducer execution time");
    describe_counter!(SHUTDOWN_REJECTED, "Actions rejected during shutdown");
}
