//! Position of one rank within a Cartesian process grid.

use serde::{Deserialize, Serialize};

use crate::error::HaloError;

/// Immutable per-run description of the process decomposition: the grid
/// dimensions and this rank's coordinate within them.
///
/// Ranks are laid out x-fastest: `rank = i + nx*(j + ny*k)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGrid {
    dims: [usize; 3],
    coords: [usize; 3],
}

impl ProcessGrid {
    /// Builds a grid position from explicit coordinates.
    pub fn new(dims: [usize; 3], coords: [usize; 3]) -> Result<Self, HaloError> {
        for axis in 0..3 {
            if coords[axis] >= dims[axis] {
                return Err(HaloError::InvalidCoords {
                    axis,
                    coord: coords[axis],
                    extent: dims[axis],
                });
            }
        }
        Ok(Self { dims, coords })
    }

    /// Derives this rank's coordinates from its linear rank.
    pub fn for_rank(rank: usize, dims: [usize; 3]) -> Result<Self, HaloError> {
        let total = dims[0] * dims[1] * dims[2];
        if rank >= total {
            return Err(HaloError::ProcessCountMismatch {
                world: rank + 1,
                expected: total,
            });
        }
        let [nx, ny, _] = dims;
        let coords = [rank % nx, (rank / nx) % ny, rank / (nx * ny)];
        Ok(Self { dims, coords })
    }

    /// Startup gate: the world size must equal the product of the grid
    /// dimensions, checked before any exchange is constructed.
    pub fn check_world_size(&self, world: usize) -> Result<(), HaloError> {
        let expected = self.dims[0] * self.dims[1] * self.dims[2];
        if world != expected {
            return Err(HaloError::ProcessCountMismatch { world, expected });
        }
        Ok(())
    }

    /// Linear rank of an arbitrary coordinate in this grid.
    #[inline]
    pub fn rank_of(&self, coords: [usize; 3]) -> usize {
        coords[0] + self.dims[0] * (coords[1] + self.dims[1] * coords[2])
    }

    /// This rank's linear rank.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank_of(self.coords)
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn coords(&self) -> [usize; 3] {
        self.coords
    }
}

/// Per-axis wraparound policy for neighbor resolution.
///
/// Non-periodic axes resolve out-of-grid neighbors to "no neighbor" and
/// the exchange engine skips those directions, rather than silently
/// exchanging across the domain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periodicity(pub [bool; 3]);

impl Periodicity {
    /// Wrap on every axis.
    pub const FULL: Periodicity = Periodicity([true; 3]);
    /// Fixed edges on every axis.
    pub const NONE: Periodicity = Periodicity([false; 3]);

    #[inline]
    pub fn axis(&self, a: usize) -> bool {
        self.0[a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_round_trips_through_coords() {
        let dims = [3, 2, 4];
        for rank in 0..24 {
            let g = ProcessGrid::for_rank(rank, dims).unwrap();
            assert_eq!(g.rank(), rank);
            assert_eq!(g.rank_of(g.coords()), rank);
        }
    }

    #[test]
    fn coords_out_of_range_rejected() {
        let err = ProcessGrid::new([2, 2, 2], [0, 2, 0]).unwrap_err();
        assert!(matches!(err, HaloError::InvalidCoords { axis: 1, .. }));
    }

    #[test]
    fn world_size_gate() {
        let g = ProcessGrid::new([2, 3, 1], [1, 2, 0]).unwrap();
        assert!(g.check_world_size(6).is_ok());
        assert_eq!(
            g.check_world_size(8),
            Err(HaloError::ProcessCountMismatch {
                world: 8,
                expected: 6
            })
        );
    }
}
