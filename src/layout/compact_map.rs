//! Dense 3-D index maps with an out-of-band "not mapped" sentinel.

use itertools::iproduct;

use crate::halo::HaloShape;

/// Sentinel for unmapped cells. Negative, so it can never collide with a
/// valid flat index or ordinal.
pub const UNMAPPED: i32 = -1;

/// A 3-D array of indices into some other index space, one entry per
/// cell, with [`UNMAPPED`] marking cells that have no image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactMap {
    dims: [usize; 3],
    data: Vec<i32>,
}

impl CompactMap {
    pub(crate) fn sentinel_filled(dims: [usize; 3]) -> Self {
        Self {
            dims,
            data: vec![UNMAPPED; dims[0] * dims[1] * dims[2]],
        }
    }

    /// Bridges a wide-halo layout back to the halo-width-1 layout the rest
    /// of the solver addresses.
    ///
    /// Walks the padded region that corresponds 1:1 to the reduced grid
    /// and records each flat padded index at the equivalent reduced
    /// coordinate; the reduced array's own one-cell border stays
    /// unmapped. Pure and deterministic: two builds from the same shape
    /// compare equal.
    pub fn wide_to_reduced(shape: &HaloShape) -> Self {
        let w = shape.width();
        let [px, py, pz] = shape.padded();
        let mut map = Self::sentinel_filled(shape.reduced());
        for (k, j, i) in iproduct!(w..pz - w, w..py - w, w..px - w) {
            map.set(i - w + 1, j - w + 1, k - w + 1, shape.flat(i, j, k));
        }
        map
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    fn flat(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.dims[0] * (j + self.dims[1] * k)
    }

    /// Mapped index at `(i, j, k)`, or `None` for unmapped cells.
    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<usize> {
        let v = self.data[self.flat(i, j, k)];
        (v != UNMAPPED).then_some(v as usize)
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, k: usize, value: usize) {
        let n = self.flat(i, j, k);
        self.data[n] = value as i32;
    }

    /// Number of mapped (non-sentinel) entries.
    pub fn mapped_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != UNMAPPED).count()
    }

    /// Raw entries, x fastest; sentinel cells hold [`UNMAPPED`].
    pub fn raw(&self) -> &[i32] {
        &self.data
    }
}
