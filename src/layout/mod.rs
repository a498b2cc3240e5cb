//! Index-space compaction: wide-halo bridging and the active-site layout.

pub mod compact_map;
pub mod neighbor_list;

pub use compact_map::{CompactMap, UNMAPPED};
pub use neighbor_list::{D3Q19, DenseLayout, Q};
