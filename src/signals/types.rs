/*!
 * Signal Types
 * UNIX signal definitions and result types
 */

use crate::core::types::SignalNumber;
use miette::Diagnostic;
use nix::sys::signal::Signal as NixSignal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Signal operation result
pub type SignalResult<T> = Result<T, SignalError>;

/// Signal errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SignalError {
    #[error("Invalid signal: {0}")]
    #[diagnostic(
        code(signal::invalid_signal),
        help("Use a name such as SIGINT, INT or a number such as 2.")
    )]
    InvalidSignal(String),

    #[error("Invalid threshold: {0}")]
    #[diagnostic(
        code(signal::invalid_threshold),
        help("The threshold must be at least 1.")
    )]
    InvalidThreshold(u64),

    #[error("Failed to install handler for {signal}: {reason}")]
    #[diagnostic(
        code(signal::handler_install_failed),
        help("The signal may be uncatchable (SIGKILL, SIGSTOP) or reserved (SIGSEGV, SIGILL, SIGFPE).")
    )]
    HandlerInstallFailed { signal: Signal, reason: String },

    #[error("Handler for {0} was replaced by a newer registration")]
    #[diagnostic(
        code(signal::handler_replaced),
        help("Only one counter may be active per signal; the latest install wins.")
    )]
    HandlerReplaced(Signal),

    #[error("Wakeup channel failed: {0}")]
    #[diagnostic(
        code(signal::wake_failed),
        help("The self-pipe used to wake the main flow could not be created or read.")
    )]
    WakeFailed(String),

    #[error("Failed to write notification: {0}")]
    #[diagnostic(code(signal::notify_failed))]
    NotifyFailed(String),
}

/// UNIX signals known to the counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Signal {
    /// Hangup detected on controlling terminal or death of controlling process
    SIGHUP,
    /// Interrupt from keyboard (Ctrl+C)
    SIGINT,
    /// Quit from keyboard (Ctrl+\)
    SIGQUIT,
    /// Illegal instruction
    SIGILL,
    /// Trace/breakpoint trap
    SIGTRAP,
    /// Abort signal
    SIGABRT,
    /// Bus error (bad memory access)
    SIGBUS,
    /// Floating-point exception
    SIGFPE,
    /// Kill signal (cannot be caught or ignored)
    SIGKILL,
    /// User-defined signal 1
    SIGUSR1,
    /// Invalid memory reference
    SIGSEGV,
    /// User-defined signal 2
    SIGUSR2,
    /// Broken pipe
    SIGPIPE,
    /// Timer signal
    SIGALRM,
    /// Termination signal
    SIGTERM,
    /// Child process stopped or terminated
    SIGCHLD,
    /// Continue if stopped
    SIGCONT,
    /// Stop process (cannot be caught or ignored)
    SIGSTOP,
    /// Stop typed at terminal (Ctrl+Z)
    SIGTSTP,
    /// Terminal input for background process
    SIGTTIN,
    /// Terminal output for background process
    SIGTTOU,
    /// Urgent condition on socket
    SIGURG,
    /// CPU time limit exceeded
    SIGXCPU,
    /// File size limit exceeded
    SIGXFSZ,
    /// Virtual alarm clock
    SIGVTALRM,
    /// Profiling timer expired
    SIGPROF,
    /// Window resize signal
    SIGWINCH,
    /// I/O now possible
    SIGIO,
    /// Bad system call
    SIGSYS,
}

impl Signal {
    pub const ALL: [Signal; 29] = [
        Signal::SIGHUP,
        Signal::SIGINT,
        Signal::SIGQUIT,
        Signal::SIGILL,
        Signal::SIGTRAP,
        Signal::SIGABRT,
        Signal::SIGBUS,
        Signal::SIGFPE,
        Signal::SIGKILL,
        Signal::SIGUSR1,
        Signal::SIGSEGV,
        Signal::SIGUSR2,
        Signal::SIGPIPE,
        Signal::SIGALRM,
        Signal::SIGTERM,
        Signal::SIGCHLD,
        Signal::SIGCONT,
        Signal::SIGSTOP,
        Signal::SIGTSTP,
        Signal::SIGTTIN,
        Signal::SIGTTOU,
        Signal::SIGURG,
        Signal::SIGXCPU,
        Signal::SIGXFSZ,
        Signal::SIGVTALRM,
        Signal::SIGPROF,
        Signal::SIGWINCH,
        Signal::SIGIO,
        Signal::SIGSYS,
    ];

    /// Platform signal this variant maps to
    pub fn to_nix(self) -> NixSignal {
        match self {
            Signal::SIGHUP => NixSignal::SIGHUP,
            Signal::SIGINT => NixSignal::SIGINT,
            Signal::SIGQUIT => NixSignal::SIGQUIT,
            Signal::SIGILL => NixSignal::SIGILL,
            Signal::SIGTRAP => NixSignal::SIGTRAP,
            Signal::SIGABRT => NixSignal::SIGABRT,
            Signal::SIGBUS => NixSignal::SIGBUS,
            Signal::SIGFPE => NixSignal::SIGFPE,
            Signal::SIGKILL => NixSignal::SIGKILL,
            Signal::SIGUSR1 => NixSignal::SIGUSR1,
            Signal::SIGSEGV => NixSignal::SIGSEGV,
            Signal::SIGUSR2 => NixSignal::SIGUSR2,
            Signal::SIGPIPE => NixSignal::SIGPIPE,
            Signal::SIGALRM => NixSignal::SIGALRM,
            Signal::SIGTERM => NixSignal::SIGTERM,
            Signal::SIGCHLD => NixSignal::SIGCHLD,
            Signal::SIGCONT => NixSignal::SIGCONT,
            Signal::SIGSTOP => NixSignal::SIGSTOP,
            Signal::SIGTSTP => NixSignal::SIGTSTP,
            Signal::SIGTTIN => NixSignal::SIGTTIN,
            Signal::SIGTTOU => NixSignal::SIGTTOU,
            Signal::SIGURG => NixSignal::SIGURG,
            Signal::SIGXCPU => NixSignal::SIGXCPU,
            Signal::SIGXFSZ => NixSignal::SIGXFSZ,
            Signal::SIGVTALRM => NixSignal::SIGVTALRM,
            Signal::SIGPROF => NixSignal::SIGPROF,
            Signal::SIGWINCH => NixSignal::SIGWINCH,
            Signal::SIGIO => NixSignal::SIGIO,
            Signal::SIGSYS => NixSignal::SIGSYS,
        }
    }

    /// Convert from the platform signal number
    pub fn from_number(n: SignalNumber) -> SignalResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.number() == n)
            .ok_or_else(|| SignalError::InvalidSignal(n.to_string()))
    }

    /// Platform signal number
    pub fn number(&self) -> SignalNumber {
        self.to_nix() as SignalNumber
    }

    /// Check if signal can be caught/blocked
    pub fn can_catch(&self) -> bool {
        !matches!(self, Signal::SIGKILL | Signal::SIGSTOP)
    }

    /// Conventional name, e.g. "SIGINT"
    pub fn name(&self) -> &'static str {
        self.to_nix().as_str()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Signal {
    type Err = SignalError;

    /// Accepts "SIGINT", "INT" (any case) or a signal number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<SignalNumber>() {
            return Self::from_number(n);
        }

        let upper = trimmed.to_ascii_uppercase();
        let name = if upper.starts_with("SIG") {
            upper
        } else {
            format!("SIG{}", upper)
        };

        Self::ALL
            .iter()
            .copied()
            .find(|sig| sig.name() == name)
            .ok_or_else(|| SignalError::InvalidSignal(s.to_string()))
    }
}

/// Result of the counter reaching its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Termination {
    pub signal: Signal,
    pub count: u64,
}

/// Snapshot of the counter for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStats {
    pub count: u64,
    pub threshold: u64,
    pub exhausted: bool,
}
