//! HaloError: unified error type for the lattice-halo public APIs.
//!
//! Every failure in this crate is unrecoverable for the step that hit it:
//! a halo exchange that cannot complete leaves the whole distributed
//! computation without a consistent timestep. Callers in batch jobs are
//! expected to log the error and abort the run.

use thiserror::Error;

/// Unified error type for halo-exchange and layout operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HaloError {
    /// A second `send` was issued while an exchange was still in flight.
    /// This indicates an unmatched send/recv pair in the caller, not a
    /// transient condition.
    #[error("exchange already in progress -- did you forget to match send/recv calls?")]
    ExchangeInProgress,
    /// `recv` was called with no exchange in flight.
    #[error("no exchange in progress -- recv must follow a matching send")]
    NoExchangeInProgress,
    /// The field slice handed to `send`/`recv` does not cover the padded grid.
    #[error("field length mismatch: expected {expected} scalars, got {got}")]
    FieldSizeMismatch { expected: usize, got: usize },
    /// Active-site count exceeded the reserved capacity during
    /// neighbor-list construction.
    #[error("active-site count {active} exceeds reserved capacity {capacity}")]
    CapacityExceeded { active: usize, capacity: usize },
    /// World size does not equal the product of the process-grid dimensions.
    #[error("process count mismatch: world has {world} ranks, grid needs {expected}")]
    ProcessCountMismatch { world: usize, expected: usize },
    /// A process coordinate lies outside the process grid.
    #[error("process coordinate {coord} out of range on axis {axis} (grid extent {extent})")]
    InvalidCoords {
        axis: usize,
        coord: usize,
        extent: usize,
    },
    /// Halo width must be at least one cell.
    #[error("halo width must be >= 1")]
    ZeroWidth,
    /// Halo width exceeds the interior extent on one axis, so the send
    /// slabs would overlap the ghost region.
    #[error("halo width {width} exceeds interior extent {extent} on axis {axis}")]
    WidthExceedsInterior {
        axis: usize,
        width: usize,
        extent: usize,
    },
    /// Underlying transport failure; never retried.
    #[error("communication with rank {peer} failed: {reason}")]
    Comm { peer: usize, reason: Box<str> },
}
