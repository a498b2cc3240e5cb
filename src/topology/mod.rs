//! Process-grid topology: rank coordinates, the 26-direction table, and
//! neighbor-rank resolution.

pub mod direction;
pub mod neighbors;
pub mod process_grid;

pub use direction::{Direction, NUM_DIRECTIONS};
pub use neighbors::NeighborTable;
pub use process_grid::{Periodicity, ProcessGrid};
