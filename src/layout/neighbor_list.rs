//! Memory-optimized layout for the active (non-solid) subset of a lattice.
//!
//! Solid obstacles can dominate a porous-media subdomain; iterating the
//! full grid wastes both bandwidth and device memory. This module assigns
//! a dense ordinal to every active site, precomputes the ordinal of each
//! site's Q stencil neighbors, and orders the sites so that the ones
//! adjacent to the subdomain boundary (which need ghost data) form a
//! contiguous prefix. A sweep can then process all interior sites between
//! `send` and `recv`, overlapping communication with computation, and
//! finish the exterior prefix once the halo has arrived.

use itertools::iproduct;

use crate::error::HaloError;
use crate::layout::compact_map::{CompactMap, UNMAPPED};

/// Discrete stencil directions of the D3Q19 velocity set (rest direction
/// excluded), in the order lattice kernels enumerate them.
pub const Q: usize = 18;

pub const D3Q19: [[i8; 3]; Q] = [
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
    [1, 1, 0],
    [-1, -1, 0],
    [1, -1, 0],
    [-1, 1, 0],
    [1, 0, 1],
    [-1, 0, -1],
    [1, 0, -1],
    [-1, 0, 1],
    [0, 1, 1],
    [0, -1, -1],
    [0, 1, -1],
    [0, -1, 1],
];

/// Compact ordinal space over the active sites of one subdomain, with a
/// precomputed neighbor list and an exterior/interior partition.
///
/// Ordinals `[0, first_interior)` are exterior sites (their stencil
/// touches at least one ghost cell); `[first_interior, last_interior)`
/// are interior sites, safe to process before the halo exchange
/// completes. The neighbor array has stride `capacity`; entries beyond
/// `last_interior` are alignment pad and stay sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DenseLayout {
    site_map: CompactMap,
    neighbors: Vec<i32>,
    capacity: usize,
    first_interior: usize,
    last_interior: usize,
}

impl DenseLayout {
    /// Builds the layout from a per-cell active flag over the reduced
    /// (halo-width-1) grid, `dims` including the one-cell ghost border.
    ///
    /// `capacity` is the reserved ordinal count (actives plus any
    /// alignment pad); construction fails with
    /// [`HaloError::CapacityExceeded`] if the active count overruns it.
    pub fn build(flags: &[bool], dims: [usize; 3], capacity: usize) -> Result<Self, HaloError> {
        let [nx, ny, nz] = dims;
        let expected = nx * ny * nz;
        if flags.len() != expected {
            return Err(HaloError::FieldSizeMismatch {
                expected,
                got: flags.len(),
            });
        }
        let flat = |i: usize, j: usize, k: usize| i + nx * (j + ny * k);
        let boundary_layer =
            |i: usize, j: usize, k: usize| i == 1 || i == nx - 2 || j == 1 || j == ny - 2 || k == 1 || k == nz - 2;
        let interior_cells = || {
            iproduct!(
                1..nz.saturating_sub(1),
                1..ny.saturating_sub(1),
                1..nx.saturating_sub(1)
            )
        };

        let active = interior_cells()
            .filter(|&(k, j, i)| flags[flat(i, j, k)])
            .count();
        if active > capacity {
            return Err(HaloError::CapacityExceeded { active, capacity });
        }

        // Two k-major sweeps: boundary-layer sites take the ordinal
        // prefix, strictly-interior sites follow.
        let mut site_map = CompactMap::sentinel_filled(dims);
        let mut next = 0usize;
        let mut first_interior = 0usize;
        for exterior_pass in [true, false] {
            for (k, j, i) in interior_cells() {
                if flags[flat(i, j, k)] && boundary_layer(i, j, k) == exterior_pass {
                    site_map.set(i, j, k, next);
                    next += 1;
                }
            }
            if exterior_pass {
                first_interior = next;
            }
        }
        debug_assert_eq!(next, active);

        let mut neighbors = vec![UNMAPPED; Q * capacity];
        for (k, j, i) in interior_cells() {
            let Some(idx) = site_map.get(i, j, k) else {
                continue;
            };
            for (q, [cx, cy, cz]) in D3Q19.iter().enumerate() {
                let ni = (i as i64 + *cx as i64) as usize;
                let nj = (j as i64 + *cy as i64) as usize;
                let nk = (k as i64 + *cz as i64) as usize;
                // Ghost and solid cells are both unmapped: the sentinel
                // propagates into the list untouched.
                if let Some(nn) = site_map.get(ni, nj, nk) {
                    neighbors[q * capacity + idx] = nn as i32;
                }
            }
        }

        log::debug!(
            "dense layout over {dims:?}: {active} active sites ({first_interior} exterior), capacity {capacity}"
        );
        Ok(Self {
            site_map,
            neighbors,
            capacity,
            first_interior,
            last_interior: active,
        })
    }

    /// Number of active sites assigned an ordinal.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.last_interior
    }

    /// First ordinal whose stencil needs no ghost data.
    #[inline]
    pub fn first_interior(&self) -> usize {
        self.first_interior
    }

    /// One past the last interior ordinal.
    #[inline]
    pub fn last_interior(&self) -> usize {
        self.last_interior
    }

    /// Ordinals that must wait for the halo exchange.
    pub fn exterior(&self) -> std::ops::Range<usize> {
        0..self.first_interior
    }

    /// Ordinals safe to process while the exchange is in flight.
    pub fn interior(&self) -> std::ops::Range<usize> {
        self.first_interior..self.last_interior
    }

    /// Ordinal of the site reached by following stencil direction `q`
    /// from site `idx`, or `None` for solid or ghost neighbors.
    #[inline]
    pub fn neighbor(&self, q: usize, idx: usize) -> Option<usize> {
        let v = self.neighbors[q * self.capacity + idx];
        (v != UNMAPPED).then_some(v as usize)
    }

    /// Raw neighbor array, stride [`Self::stride`], sentinel = `UNMAPPED`.
    pub fn neighbors(&self) -> &[i32] {
        &self.neighbors
    }

    /// Stride between consecutive `q` planes of the neighbor array.
    #[inline]
    pub fn stride(&self) -> usize {
        self.capacity
    }

    /// Map from reduced grid cells to ordinals.
    pub fn site_map(&self) -> &CompactMap {
        &self.site_map
    }

    /// Ordinal of the active site at reduced coordinate `(i, j, k)`.
    #[inline]
    pub fn ordinal(&self, i: usize, j: usize, k: usize) -> Option<usize> {
        self.site_map.get(i, j, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_active(dims: [usize; 3]) -> Vec<bool> {
        vec![true; dims[0] * dims[1] * dims[2]]
    }

    #[test]
    fn fully_open_five_cube() {
        // 3^3 interior sites, only the center is strictly interior.
        let dims = [5, 5, 5];
        let layout = DenseLayout::build(&all_active(dims), dims, 27).unwrap();
        assert_eq!(layout.active_count(), 27);
        assert_eq!(layout.first_interior(), 26);
        assert_eq!(layout.last_interior(), 27);
        assert_eq!(layout.ordinal(2, 2, 2), Some(26));
        // The center site resolves all 18 neighbors locally.
        for q in 0..Q {
            assert!(layout.neighbor(q, 26).is_some());
        }
    }

    #[test]
    fn partition_is_complete_and_disjoint() {
        let dims = [6, 5, 7];
        let layout = DenseLayout::build(&all_active(dims), dims, 200).unwrap();
        assert_eq!(
            layout.exterior().len() + layout.interior().len(),
            layout.active_count()
        );
        // Interior sites never reach into the ghost border: all of their
        // neighbors are mapped whenever the neighbor cell is active.
        for idx in layout.interior() {
            for q in 0..Q {
                assert!(
                    layout.neighbor(q, idx).is_some(),
                    "interior site {idx} lost neighbor q={q}"
                );
            }
        }
    }

    #[test]
    fn solid_neighbors_are_sentinel() {
        let dims = [5, 5, 5];
        let mut flags = all_active(dims);
        // Wall off the cell at (2, 2, 1).
        flags[2 + 5 * (2 + 5)] = false;
        let layout = DenseLayout::build(&flags, dims, 26).unwrap();
        assert_eq!(layout.active_count(), 26);
        assert_eq!(layout.ordinal(2, 2, 1), None);
        let center = layout.ordinal(2, 2, 2).unwrap();
        // q = 5 points along (0, 0, -1), straight into the wall.
        assert_eq!(layout.neighbor(5, center), None);
        // q = 4 points the other way and stays open.
        assert!(layout.neighbor(4, center).is_some());
    }

    #[test]
    fn capacity_overrun_fails() {
        let dims = [5, 5, 5];
        let err = DenseLayout::build(&all_active(dims), dims, 16).unwrap_err();
        assert_eq!(
            err,
            HaloError::CapacityExceeded {
                active: 27,
                capacity: 16
            }
        );
    }

    #[test]
    fn pad_entries_stay_sentinel() {
        let dims = [4, 4, 4];
        let layout = DenseLayout::build(&all_active(dims), dims, 12).unwrap();
        assert_eq!(layout.active_count(), 8);
        for q in 0..Q {
            for idx in layout.active_count()..layout.stride() {
                assert_eq!(layout.neighbors()[q * layout.stride() + idx], UNMAPPED);
            }
        }
    }

    #[test]
    fn flag_grid_length_checked() {
        let err = DenseLayout::build(&[true; 10], [5, 5, 5], 32).unwrap_err();
        assert!(matches!(err, HaloError::FieldSizeMismatch { .. }));
    }
}
