//! # lattice-halo
//!
//! lattice-halo is a distributed halo-exchange engine for regular 3-D
//! structured grids, built for stencil-based lattice solvers that need
//! up-to-date boundary values from adjacent subdomains before every sweep.
//! It provides:
//!
//! - Cartesian process-grid topology with all 26 face/edge/corner
//!   neighbors, with per-axis periodic or fixed boundaries
//! - boundary index lists for an arbitrarily wide ghost region, generated
//!   from a single per-axis slab rule
//! - an asynchronous pack / send / recv / unpack protocol with a
//!   single-outstanding-exchange guarantee
//! - memory-optimized layouts for the active (non-solid) subset of a
//!   lattice, partitioned so interior work overlaps communication
//! - pluggable communication backends (no-op, in-process mailbox, MPI)
//!
//! ## Per-step protocol
//!
//! ```text
//! engine.send(&field)?;         // pack boundary layers, post transfers
//! sweep(layout.interior());     // ghost-independent work, comm in flight
//! engine.recv(&mut field)?;     // wait, unpack ghost layers
//! sweep(layout.exterior());     // work that needed neighbor data
//! ```
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! lattice-halo = "0.1"
//! # Optional features:
//! # features = ["mpi-support", "rayon-pack"]
//! ```
//!
//! Errors are unrecoverable for the step that raised them; see
//! [`error::HaloError`] for the full taxonomy.

pub mod comm;
pub mod error;
pub mod halo;
pub mod layout;
pub mod topology;

/// A convenient prelude importing the most-used types.
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::MpiComm;
    pub use crate::comm::{CommTag, Communicator, NoComm, ThreadComm, Wait};
    pub use crate::error::HaloError;
    pub use crate::halo::{HaloExchange, HaloShape};
    pub use crate::layout::{CompactMap, DenseLayout};
    pub use crate::topology::{Direction, NeighborTable, Periodicity, ProcessGrid};
}
