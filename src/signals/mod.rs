/*!
 * Signals Module
 * Counting handler for an asynchronous interrupt signal
 */

mod counter;
mod state;
pub mod types;

// Re-export public API
pub use counter::SignalCounter;
pub use state::SignalState;
pub use types::{Signal, SignalError, SignalResult, SignalStats, Termination};
