//! 3x3x3 table of neighbor ranks for one subdomain.

use crate::topology::direction::Direction;
use crate::topology::process_grid::{Periodicity, ProcessGrid};

/// Maps every relative offset in {-1,0,1}^3 to a destination rank.
///
/// Built once at construction, read-only thereafter. `None` means the
/// step leaves the grid on a non-periodic axis and the exchange engine
/// must skip that direction. The self entry (offset zero) is always
/// `Some(own rank)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborTable {
    ranks: [Option<usize>; 27],
    self_rank: usize,
}

#[inline]
fn slot(offset: [i8; 3]) -> usize {
    let [dx, dy, dz] = offset;
    (dx + 1) as usize + 3 * ((dy + 1) as usize + 3 * (dz + 1) as usize)
}

impl NeighborTable {
    /// Resolves all 27 entries with per-axis modular wraparound where the
    /// axis is periodic.
    pub fn build(grid: &ProcessGrid, periodic: Periodicity) -> Self {
        let dims = grid.dims();
        let coords = grid.coords();
        let mut ranks = [None; 27];
        for dz in -1i8..=1 {
            for dy in -1i8..=1 {
                for dx in -1i8..=1 {
                    let step = [dx, dy, dz];
                    let mut dest = [0usize; 3];
                    let mut reachable = true;
                    for a in 0..3 {
                        let n = dims[a] as i64;
                        let c = coords[a] as i64 + step[a] as i64;
                        if (0..n).contains(&c) {
                            dest[a] = c as usize;
                        } else if periodic.axis(a) {
                            dest[a] = c.rem_euclid(n) as usize;
                        } else {
                            reachable = false;
                            break;
                        }
                    }
                    if reachable {
                        ranks[slot(step)] = Some(grid.rank_of(dest));
                    }
                }
            }
        }
        let table = Self {
            ranks,
            self_rank: grid.rank(),
        };
        log::debug!(
            "rank {}: {} of 26 neighbors resolved",
            table.self_rank,
            Direction::ALL
                .iter()
                .filter(|d| table.rank(**d).is_some())
                .count()
        );
        table
    }

    /// Neighbor rank in the given direction, `None` at a fixed edge.
    #[inline]
    pub fn rank(&self, d: Direction) -> Option<usize> {
        self.ranks[slot(d.offset())]
    }

    /// This rank (the offset-zero entry).
    #[inline]
    pub fn self_rank(&self) -> usize {
        self.self_rank
    }
}
