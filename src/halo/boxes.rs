//! Boundary-box construction for an arbitrarily wide ghost region.
//!
//! Every one of the 26 directions gets a send box (the innermost
//! `width`-thick slab on the interior side of that face/edge/corner) and a
//! receive box (the outermost slab, on the ghost side). Both derive from a
//! single per-axis rule -- one of three [`Slab`] choices per axis -- so no
//! box is ever written out by hand.

use std::ops::Range;

use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::error::HaloError;
use crate::topology::Direction;

/// Shape of one subdomain's halo-padded local array.
///
/// `interior` is the unpadded local extent per axis; the padded extent is
/// `interior + 2*width` and the reduced (halo-width-1) extent used by the
/// rest of the solver is `interior + 2`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaloShape {
    interior: [usize; 3],
    width: usize,
}

impl HaloShape {
    /// Rejects `width == 0` and any axis thinner than the halo: a send
    /// slab of a width-`w` halo needs `w` interior cells to read from,
    /// or it would pack stale ghost values.
    pub fn new(interior: [usize; 3], width: usize) -> Result<Self, HaloError> {
        if width == 0 {
            return Err(HaloError::ZeroWidth);
        }
        for (axis, &extent) in interior.iter().enumerate() {
            if width > extent {
                return Err(HaloError::WidthExceedsInterior {
                    axis,
                    width,
                    extent,
                });
            }
        }
        Ok(Self { interior, width })
    }

    #[inline]
    pub fn interior(&self) -> [usize; 3] {
        self.interior
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Per-axis extent of the halo-padded array.
    #[inline]
    pub fn padded(&self) -> [usize; 3] {
        self.interior.map(|n| n + 2 * self.width)
    }

    /// Element count of the padded array.
    #[inline]
    pub fn padded_len(&self) -> usize {
        let [x, y, z] = self.padded();
        x * y * z
    }

    /// Per-axis extent of the reduced, halo-width-1 array.
    #[inline]
    pub fn reduced(&self) -> [usize; 3] {
        self.interior.map(|n| n + 2)
    }

    #[inline]
    pub fn reduced_len(&self) -> usize {
        let [x, y, z] = self.reduced();
        x * y * z
    }

    /// Flat index of a padded-space coordinate, x fastest.
    #[inline]
    pub fn flat(&self, i: usize, j: usize, k: usize) -> usize {
        let [px, py, _] = self.padded();
        i + px * (j + py * k)
    }
}

/// Per-axis slab choice: the three building blocks every box combines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Slab {
    Low,
    Mid,
    High,
}

impl Slab {
    #[inline]
    fn of(step: i8) -> Slab {
        match step {
            -1 => Slab::Low,
            0 => Slab::Mid,
            _ => Slab::High,
        }
    }

    /// Index range of the send layer along an axis of padded extent `n`:
    /// the innermost `w`-thick slab on the interior side.
    fn send_range(self, n: usize, w: usize) -> Range<usize> {
        match self {
            Slab::Low => w..2 * w,
            Slab::Mid => w..n - w,
            Slab::High => n - 2 * w..n - w,
        }
    }

    /// Index range of the receive layer: the outermost `w`-thick slab.
    fn recv_range(self, n: usize, w: usize) -> Range<usize> {
        match self {
            Slab::Low => 0..w,
            Slab::Mid => w..n - w,
            Slab::High => n - w..n,
        }
    }
}

/// Enumerates every padded index inside the axis-aligned box, k-major.
///
/// The enumeration order is the correctness contract of the exchange: the
/// payload carries no positions, so the sender's pack order and the
/// receiver's unpack order must agree index for index. Both sides walk
/// mirrored boxes with identical extents through this one function.
fn halo_block(shape: &HaloShape, xr: Range<usize>, yr: Range<usize>, zr: Range<usize>) -> Vec<usize> {
    let count = xr.len() * yr.len() * zr.len();
    let mut list = Vec::with_capacity(count);
    for (k, j, i) in iproduct!(zr, yr, xr) {
        list.push(shape.flat(i, j, k));
    }
    debug_assert_eq!(list.len(), count);
    list
}

fn ranges(
    shape: &HaloShape,
    dir: Direction,
    pick: impl Fn(Slab, usize, usize) -> Range<usize>,
) -> [Range<usize>; 3] {
    let padded = shape.padded();
    let [dx, dy, dz] = dir.offset();
    [
        pick(Slab::of(dx), padded[0], shape.width()),
        pick(Slab::of(dy), padded[1], shape.width()),
        pick(Slab::of(dz), padded[2], shape.width()),
    ]
}

/// Flat indices of the cells to pack when sending toward `dir`.
pub fn send_box(shape: &HaloShape, dir: Direction) -> Vec<usize> {
    let [xr, yr, zr] = ranges(shape, dir, Slab::send_range);
    halo_block(shape, xr, yr, zr)
}

/// Flat indices of the ghost cells filled by data arriving from `dir`.
pub fn recv_box(shape: &HaloShape, dir: Direction) -> Vec<usize> {
    let [xr, yr, zr] = ranges(shape, dir, Slab::recv_range);
    halo_block(shape, xr, yr, zr)
}
