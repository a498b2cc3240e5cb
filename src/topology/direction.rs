//! The 26 face/edge/corner directions of a 3-D structured decomposition.
//!
//! A `Direction` is one of the non-zero offsets in {-1,0,1}^3. The table
//! is *generated* from the per-axis step combinatorics rather than spelled
//! out by hand: every phase of the exchange (neighbor lookup, box
//! construction, pack, transfer, unpack) loops over [`Direction::ALL`]
//! instead of repeating itself 26 times, which removes the copy-paste
//! defect class entirely.

use static_assertions::const_assert;

/// Number of non-zero offsets in {-1,0,1}^3.
pub const NUM_DIRECTIONS: usize = 26;

/// Offsets in enumeration order: z-major, then y, then x, skipping (0,0,0).
const OFFSETS: [[i8; 3]; NUM_DIRECTIONS] = {
    let mut out = [[0i8; 3]; NUM_DIRECTIONS];
    let mut n = 0;
    let mut dz = -1i8;
    while dz <= 1 {
        let mut dy = -1i8;
        while dy <= 1 {
            let mut dx = -1i8;
            while dx <= 1 {
                if !(dx == 0 && dy == 0 && dz == 0) {
                    out[n] = [dx, dy, dz];
                    n += 1;
                }
                dx += 1;
            }
            dy += 1;
        }
        dz += 1;
    }
    out
};

/// Index of the opposite offset, precomputed so `opposite` is a lookup.
const OPPOSITE: [u8; NUM_DIRECTIONS] = {
    let mut out = [0u8; NUM_DIRECTIONS];
    let mut i = 0;
    while i < NUM_DIRECTIONS {
        let [dx, dy, dz] = OFFSETS[i];
        let mut j = 0;
        while j < NUM_DIRECTIONS {
            let [ox, oy, oz] = OFFSETS[j];
            if ox == -dx && oy == -dy && oz == -dz {
                out[i] = j as u8;
            }
            j += 1;
        }
        i += 1;
    }
    out
};

// Both generators filled every slot: the first offset is (-1,-1,-1),
// so its opposite must be the last entry, (1,1,1).
const_assert!(OPPOSITE[0] as usize == NUM_DIRECTIONS - 1);

/// One of the 26 neighbor directions, identified by a stable index.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Direction(u8);

impl Direction {
    /// All 26 directions in enumeration order.
    pub const ALL: [Direction; NUM_DIRECTIONS] = {
        let mut out = [Direction(0); NUM_DIRECTIONS];
        let mut i = 0;
        while i < NUM_DIRECTIONS {
            out[i] = Direction(i as u8);
            i += 1;
        }
        out
    };

    /// Stable index in `[0, 26)`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The per-axis step of this direction.
    #[inline]
    pub const fn offset(self) -> [i8; 3] {
        OFFSETS[self.0 as usize]
    }

    /// The direction pointing the other way.
    #[inline]
    pub const fn opposite(self) -> Direction {
        Direction(OPPOSITE[self.0 as usize])
    }

    /// Looks up the direction for a non-zero offset.
    pub fn from_offset(offset: [i8; 3]) -> Option<Direction> {
        OFFSETS
            .iter()
            .position(|o| *o == offset)
            .map(|i| Direction(i as u8))
    }

    /// Number of non-zero axes: 1 for a face, 2 for an edge, 3 for a corner.
    pub fn order(self) -> usize {
        self.offset().iter().filter(|d| **d != 0).count()
    }
}
