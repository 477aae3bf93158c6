/*!
 * Runtime Configuration
 *
 * Environment-driven settings, overridable from the command line.
 *
 * Environment variables:
 * - PROCSUP_SIGNAL: signal intercepted by the counter (default: SIGINT)
 * - PROCSUP_SIGNAL_THRESHOLD: deliveries before termination (default: 3)
 * - PROCSUP_TRACE_JSON: emit JSON logs when "1" or "true" (default: false)
 */

use super::errors::SupervisorError;
use super::limits::{DEFAULT_SIGNAL_THRESHOLD, MAX_SIGNAL_THRESHOLD};
use crate::signals::Signal;

pub const ENV_SIGNAL: &str = "PROCSUP_SIGNAL";
pub const ENV_SIGNAL_THRESHOLD: &str = "PROCSUP_SIGNAL_THRESHOLD";
pub const ENV_TRACE_JSON: &str = "PROCSUP_TRACE_JSON";

/// Settings shared by every `procsup` subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Signal intercepted by the counter
    pub signal: Signal,
    /// Deliveries before the counter terminates the process
    pub threshold: u64,
    /// JSON-formatted logs instead of the compact human format
    pub trace_json: bool,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self {
            signal: Signal::SIGINT,
            threshold: DEFAULT_SIGNAL_THRESHOLD,
            trace_json: false,
        }
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self, SupervisorError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (unset keys keep their defaults)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SupervisorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(raw) = lookup(ENV_SIGNAL) {
            let signal = raw
                .parse::<Signal>()
                .map_err(|e| SupervisorError::Configuration(format!("{}: {}", ENV_SIGNAL, e)))?;
            config = config.with_signal(signal);
        }

        if let Some(raw) = lookup(ENV_SIGNAL_THRESHOLD) {
            let threshold = raw.trim().parse::<u64>().map_err(|e| {
                SupervisorError::Configuration(format!("{}={:?}: {}", ENV_SIGNAL_THRESHOLD, raw, e))
            })?;
            config = config.with_threshold(threshold);
        }

        if let Some(raw) = lookup(ENV_TRACE_JSON) {
            config = config.with_trace_json(raw == "1" || raw.eq_ignore_ascii_case("true"));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_trace_json(mut self, trace_json: bool) -> Self {
        self.trace_json = trace_json;
        self
    }

    /// Reject values the counter cannot honor
    pub fn validate(&self) -> Result<(), SupervisorError> {
        if self.threshold == 0 || self.threshold > MAX_SIGNAL_THRESHOLD {
            return Err(SupervisorError::Configuration(format!(
                "threshold must be between 1 and {}, got {}",
                MAX_SIGNAL_THRESHOLD, self.threshold
            )));
        }
        if !self.signal.can_catch() {
            return Err(SupervisorError::Configuration(format!(
                "{} cannot be caught",
                self.signal
            )));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
