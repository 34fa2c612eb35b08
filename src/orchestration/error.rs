//! Error taxonomy for the orchestration kernel.
//!
//! Generalizes the teacher's `FailureKind::classify`/`is_retryable` split
//! (page-retry classification) to the kernel's full fatal/absorbed policy
//! table (spec.md §7): `ErrorKind` is the tag that crosses IPC, while
//! `OrchestratorError` is the typed error a phase can raise.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tag carried on IPC error envelopes and by absorbed task failures.
/// Not a language exception type — an enumerated policy key (spec.md §4.1, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    DepthLimit,
    NavigationTimeout,
    HttpError,
    InvalidPayload,
    WorkerCrash,
    AllocationTimeout,
    PhaseTimeout,
    InvariantViolation,
}

impl ErrorKind {
    /// Whether this kind halts the run or merely degrades it (spec.md §7 table).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AllocationTimeout | Self::PhaseTimeout | Self::InvariantViolation
        )
    }

    /// Whether a page failing with this kind counts toward user-facing failure totals.
    #[must_use]
    pub const fn counts_as_failure(&self) -> bool {
        !matches!(self, Self::DepthLimit)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DepthLimit => "DEPTH_LIMIT",
            Self::NavigationTimeout => "NAVIGATION_TIMEOUT",
            Self::HttpError => "HTTP_ERROR",
            Self::InvalidPayload => "INVALID_PAYLOAD",
            Self::WorkerCrash => "WORKER_CRASH",
            Self::AllocationTimeout => "ALLOCATION_TIMEOUT",
            Self::PhaseTimeout => "PHASE_TIMEOUT",
            Self::InvariantViolation => "INVARIANT_VIOLATION",
        };
        f.write_str(s)
    }
}

/// Error surfaced on the wire: `{ message, kind, stackTrace? }` (spec.md §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub message: String,
    pub kind: ErrorKind,
    pub stack_trace: Option<String>,
}

/// Typed orchestrator-side error. Only the fatal variants are allowed to
/// propagate out of `Orchestrator::run` (spec.md §7's recovery-policy rule);
/// everything else is handled by absorbing the task failure into stats.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no idle worker available after {0}s")]
    AllocationTimeout(u64),

    #[error("phase '{phase}' made no progress for {secs}s")]
    PhaseTimeout { phase: &'static str, secs: u64 },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("worker process error: {0}")]
    WorkerIo(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrchestratorError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AllocationTimeout(_) => ErrorKind::AllocationTimeout,
            Self::PhaseTimeout { .. } => ErrorKind::PhaseTimeout,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::WorkerIo(_) | Self::Other(_) => ErrorKind::WorkerCrash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_allocation_phase_invariant_are_fatal() {
        assert!(ErrorKind::AllocationTimeout.is_fatal());
        assert!(ErrorKind::PhaseTimeout.is_fatal());
        assert!(ErrorKind::InvariantViolation.is_fatal());
        assert!(!ErrorKind::DepthLimit.is_fatal());
        assert!(!ErrorKind::NavigationTimeout.is_fatal());
        assert!(!ErrorKind::HttpError.is_fatal());
        assert!(!ErrorKind::InvalidPayload.is_fatal());
        assert!(!ErrorKind::WorkerCrash.is_fatal());
    }

    #[test]
    fn depth_limit_is_absorbed_not_counted() {
        assert!(!ErrorKind::DepthLimit.counts_as_failure());
        assert!(ErrorKind::NavigationTimeout.counts_as_failure());
    }
}
