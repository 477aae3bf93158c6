/*!
 * Signal Counter
 *
 * Counts deliveries of one signal and decides when the process terminates.
 *
 * The raw handler does the minimum that is async-signal-safe: a lock-free
 * increment of the shared counter and a non-blocking one-byte write to a
 * self-pipe. Reporting and the threshold decision run on the main flow after
 * it wakes from the pipe.
 */

use super::state::SignalState;
use super::types::{Signal, SignalError, SignalResult, Termination};
use crate::core::limits::WAKE_DRAIN_BUFFER;
use parking_lot::{const_mutex, Mutex};
use signal_hook::consts::FORBIDDEN;
use signal_hook::low_level;
use signal_hook::SigId;
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Active registration per signal (last writer wins)
static ACTIVE_HANDLERS: Mutex<Option<HashMap<Signal, SigId>>> = const_mutex(None);

/// Installed counter for a single signal
pub struct SignalCounter {
    signal: Signal,
    state: Arc<SignalState>,
    wake: UnixStream,
    id: SigId,
    observed: u64,
}

impl SignalCounter {
    /// Register the counting handler for `signal`
    ///
    /// Replaces any counter previously installed for the same signal. Must be
    /// called before the main flow starts waiting.
    pub fn install(signal: Signal, threshold: u64) -> SignalResult<Self> {
        if threshold == 0 {
            return Err(SignalError::InvalidThreshold(threshold));
        }
        if !signal.can_catch() {
            return Err(SignalError::HandlerInstallFailed {
                signal,
                reason: "signal cannot be caught".to_string(),
            });
        }
        if FORBIDDEN.contains(&signal.number()) {
            return Err(SignalError::HandlerInstallFailed {
                signal,
                reason: "signal is reserved for fault handling".to_string(),
            });
        }

        let (wake, notifier) =
            UnixStream::pair().map_err(|e| SignalError::WakeFailed(e.to_string()))?;
        notifier
            .set_nonblocking(true)
            .map_err(|e| SignalError::WakeFailed(e.to_string()))?;

        let state = Arc::new(SignalState::new(threshold));
        let handler_state = Arc::clone(&state);

        let mut active = ACTIVE_HANDLERS.lock();

        // SAFETY: the action performs one atomic CAS loop and one non-blocking
        // write(2); it neither allocates nor takes locks.
        let id = unsafe {
            low_level::register(signal.number(), move || {
                if handler_state.record_delivery().is_some() {
                    let _ = (&notifier).write(&[1]);
                }
            })
        }
        .map_err(|e| SignalError::HandlerInstallFailed {
            signal,
            reason: e.to_string(),
        })?;

        if let Some(previous) = active.get_or_insert_with(HashMap::new).insert(signal, id) {
            low_level::unregister(previous);
            debug!(signal = %signal, "replaced previous signal counter");
        }

        info!(signal = %signal, threshold, "signal counter installed");

        Ok(Self {
            signal,
            state,
            wake,
            id,
            observed: 0,
        })
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Shared delivery state, readable from any thread
    pub fn state(&self) -> &SignalState {
        &self.state
    }

    /// Whether this counter is still the registered one for its signal
    pub fn is_active(&self) -> bool {
        ACTIVE_HANDLERS
            .lock()
            .as_ref()
            .and_then(|active| active.get(&self.signal).copied())
            == Some(self.id)
    }

    /// Block until the count advances past what this caller last observed
    ///
    /// Sleeps in `read(2)` on the self-pipe, consuming no CPU. Returns the
    /// latest count; several deliveries may have coalesced into one wakeup.
    pub fn wait_for_delivery(&mut self) -> SignalResult<u64> {
        let mut drain = [0u8; WAKE_DRAIN_BUFFER];
        loop {
            let current = self.state.count();
            if current > self.observed {
                self.observed = current;
                return Ok(current);
            }

            match self.wake.read(&mut drain) {
                Ok(0) => return Err(SignalError::HandlerReplaced(self.signal)),
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(SignalError::WakeFailed(e.to_string())),
            }
        }
    }

    /// Idle until the threshold is reached, reporting every count in order
    ///
    /// Writes `<SIGNAL> received. Count: k` for each k, then `Exiting...`.
    /// The caller is expected to end the process with the returned
    /// `Termination`; no count beyond the threshold is ever reported.
    pub fn run<W: Write>(&mut self, mut out: W) -> SignalResult<Termination> {
        let threshold = self.state.threshold();
        info!(signal = %self.signal, threshold, "waiting for signal deliveries");

        loop {
            let previous = self.observed;
            let current = self.wait_for_delivery()?;

            for count in previous + 1..=current {
                writeln!(out, "{} received. Count: {}", self.signal, count)
                    .map_err(|e| SignalError::NotifyFailed(e.to_string()))?;
                info!(signal = %self.signal, count, threshold, "signal delivered");
            }

            if current >= threshold {
                writeln!(out, "Exiting...").map_err(|e| SignalError::NotifyFailed(e.to_string()))?;
                out.flush()
                    .map_err(|e| SignalError::NotifyFailed(e.to_string()))?;
                warn!(signal = %self.signal, count = current, "threshold reached, terminating");
                return Ok(Termination {
                    signal: self.signal,
                    count: current,
                });
            }

            out.flush()
                .map_err(|e| SignalError::NotifyFailed(e.to_string()))?;
        }
    }
}

impl Drop for SignalCounter {
    /// Unregisters the handler if it is still the active one. The OS
    /// disposition stays caught, so later deliveries are ignored rather than
    /// falling back to the default action.
    fn drop(&mut self) {
        let mut active = ACTIVE_HANDLERS.lock();
        if let Some(map) = active.as_mut() {
            if map.get(&self.signal) == Some(&self.id) {
                map.remove(&self.signal);
                low_level::unregister(self.id);
                debug!(signal = %self.signal, "signal counter removed");
            }
        }
    }
}

impl std::fmt::Debug for SignalCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalCounter")
            .field("signal", &self.signal)
            .field("state", &self.state.snapshot())
            .field("observed", &self.observed)
            .finish()
    }
}
