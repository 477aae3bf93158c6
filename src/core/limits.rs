/*!
 * Limits and Constants
 *
 * Defaults, exit codes and sizing constants in one place.
 */

// =============================================================================
// EXIT CODES
// =============================================================================

/// Normal completion
pub const EXIT_SUCCESS: i32 = 0;

/// Spawn failure, missing external resource, handler install failure or bad configuration
pub const EXIT_FAILURE: i32 = 1;

// =============================================================================
// SIGNAL COUNTER
// =============================================================================

/// Deliveries tolerated before the counter terminates the process
pub const DEFAULT_SIGNAL_THRESHOLD: u64 = 3;

/// Upper bound accepted from configuration
pub const MAX_SIGNAL_THRESHOLD: u64 = 1_000_000;

/// Bytes drained from the self-pipe per wakeup
/// Deliveries coalesce, the count itself lives in the atomic
pub const WAKE_DRAIN_BUFFER: usize = 64;

// =============================================================================
// PROCESS SUPERVISOR
// =============================================================================

/// Name of the thread feeding `InputExchange::Lines` into a child's stdin
pub const STDIN_FEEDER_THREAD: &str = "stdin-feeder";

/// Buffer size for the copy job
pub const COPY_BUFFER_SIZE: usize = 8 * 1024;
