//! Active-site compaction: partition and neighbor-resolution properties.

use lattice_halo::layout::{D3Q19, DenseLayout, Q};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const DIMS: [usize; 3] = [8, 7, 6];

fn flat(i: usize, j: usize, k: usize) -> usize {
    i + DIMS[0] * (j + DIMS[1] * k)
}

/// Porous flag grid with a fixed seed so failures reproduce.
fn porous_flags(seed: u64, open_fraction: f64) -> Vec<bool> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut flags = vec![false; DIMS[0] * DIMS[1] * DIMS[2]];
    for k in 1..DIMS[2] - 1 {
        for j in 1..DIMS[1] - 1 {
            for i in 1..DIMS[0] - 1 {
                flags[flat(i, j, k)] = rng.gen_bool(open_fraction);
            }
        }
    }
    flags
}

/// Reverse map: ordinal -> reduced coordinate.
fn cells_by_ordinal(layout: &DenseLayout) -> Vec<[usize; 3]> {
    let mut cells = vec![[0usize; 3]; layout.active_count()];
    for k in 0..DIMS[2] {
        for j in 0..DIMS[1] {
            for i in 0..DIMS[0] {
                if let Some(idx) = layout.ordinal(i, j, k) {
                    cells[idx] = [i, j, k];
                }
            }
        }
    }
    cells
}

#[test]
fn partition_covers_every_active_site_exactly_once() {
    let flags = porous_flags(42, 0.7);
    let active = flags.iter().filter(|f| **f).count();
    let layout = DenseLayout::build(&flags, DIMS, active + 32).unwrap();

    assert_eq!(layout.active_count(), active);
    assert_eq!(
        layout.exterior().len() + layout.interior().len(),
        layout.active_count()
    );

    // Each ordinal in [0, active_count) is claimed by exactly one cell.
    let cells = cells_by_ordinal(&layout);
    let mut seen = vec![false; layout.active_count()];
    for &[i, j, k] in &cells {
        let idx = layout.ordinal(i, j, k).unwrap();
        assert!(!seen[idx]);
        seen[idx] = true;
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn interior_sites_never_touch_the_ghost_border() {
    let flags = porous_flags(7, 0.6);
    let active = flags.iter().filter(|f| **f).count();
    let layout = DenseLayout::build(&flags, DIMS, active + 32).unwrap();
    let cells = cells_by_ordinal(&layout);

    for idx in layout.interior() {
        let [i, j, k] = cells[idx];
        for [cx, cy, cz] in D3Q19 {
            let ni = (i as i64 + cx as i64) as usize;
            let nj = (j as i64 + cy as i64) as usize;
            let nk = (k as i64 + cz as i64) as usize;
            assert!(
                (1..DIMS[0] - 1).contains(&ni)
                    && (1..DIMS[1] - 1).contains(&nj)
                    && (1..DIMS[2] - 1).contains(&nk),
                "interior ordinal {idx} reaches ghost cell ({ni},{nj},{nk})"
            );
        }
    }
    for idx in layout.exterior() {
        let [i, j, k] = cells[idx];
        let on_layer = [i, j, k]
            .iter()
            .zip(DIMS)
            .any(|(&c, n)| c == 1 || c == n - 2);
        assert!(on_layer, "exterior ordinal {idx} not on the boundary layer");
    }
}

/// The classic layout check: store a coordinate-encoded value per site,
/// follow every neighbor link, and confirm it lands on the encoded
/// coordinates of the adjacent cell.
#[test]
fn neighbor_links_resolve_to_the_adjacent_cell() {
    let flags = porous_flags(1234, 0.8);
    let active = flags.iter().filter(|f| **f).count();
    let layout = DenseLayout::build(&flags, DIMS, active + 32).unwrap();
    let cells = cells_by_ordinal(&layout);

    let encode = |[i, j, k]: [usize; 3]| (k * 100 + j * 10 + i) as f64;
    let values: Vec<f64> = cells.iter().map(|&c| encode(c)).collect();

    for idx in 0..layout.active_count() {
        let [i, j, k] = cells[idx];
        for (q, [cx, cy, cz]) in D3Q19.iter().enumerate() {
            let Some(nn) = layout.neighbor(q, idx) else {
                continue;
            };
            let target = [
                (i as i64 + *cx as i64) as usize,
                (j as i64 + *cy as i64) as usize,
                (k as i64 + *cz as i64) as usize,
            ];
            assert_eq!(values[nn], encode(target), "q={q} idx={idx}");
        }
    }
}

#[test]
fn stride_matches_capacity_for_aligned_kernels() {
    let flags = porous_flags(5, 0.5);
    let active = flags.iter().filter(|f| **f).count();
    let capacity = active + 32;
    let layout = DenseLayout::build(&flags, DIMS, capacity).unwrap();
    assert_eq!(layout.stride(), capacity);
    assert_eq!(layout.neighbors().len(), Q * capacity);
}
