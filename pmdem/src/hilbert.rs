//! Hilbert-curve tile identifiers.
//!
//! Archives order every tile of every zoom level along a single axis: all
//! tiles of zoom `z` come after all tiles of lower zooms, and within a zoom
//! they follow the Hilbert curve over the `2^z × 2^z` grid.

/// Highest zoom level whose tile ids fit in a `u64`.
pub const MAX_ZOOM: u8 = 31;

/// Number of tiles in all zoom levels strictly below `z`: `(4^z - 1) / 3`.
pub fn zoom_base(z: u8) -> u64 {
    debug_assert!(z <= MAX_ZOOM);
    ((1u64 << (2 * u32::from(z))) - 1) / 3
}

/// Convert a tile coordinate to its archive-wide tile id.
///
/// `x` and `y` must be below `2^z`.
pub fn tile_id(z: u8, x: u32, y: u32) -> u64 {
    if z == 0 {
        return 0;
    }
    zoom_base(z) + hilbert_distance(z, u64::from(x), u64::from(y))
}

/// Distance of `(x, y)` along the Hilbert curve of order `order`.
fn hilbert_distance(order: u8, mut x: u64, mut y: u64) -> u64 {
    let mut d = 0u64;
    let mut s = 1u64 << (order - 1);

    while s > 0 {
        let rx = u64::from(x & s != 0);
        let ry = u64::from(y & s != 0);
        d += s * s * ((3 * rx) ^ ry);

        x &= s - 1;
        y &= s - 1;
        if ry == 0 {
            if rx == 1 {
                x = s - 1 - x;
                y = s - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        s >>= 1;
    }

    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_zoom_zero() {
        assert_eq!(tile_id(0, 0, 0), 0);
    }

    #[test]
    fn test_zoom_base() {
        assert_eq!(zoom_base(0), 0);
        assert_eq!(zoom_base(1), 1);
        assert_eq!(zoom_base(2), 5);
        assert_eq!(zoom_base(3), 21);
        assert_eq!(zoom_base(20), 366_503_875_925);
    }

    #[test]
    fn test_zoom_one_order() {
        assert_eq!(tile_id(1, 0, 0), 1);
        assert_eq!(tile_id(1, 0, 1), 2);
        assert_eq!(tile_id(1, 1, 1), 3);
        assert_eq!(tile_id(1, 1, 0), 4);
    }

    #[test]
    fn test_first_tile_of_zoom() {
        assert_eq!(tile_id(2, 0, 0), 5);
        assert_eq!(tile_id(3, 0, 0), 21);
        assert_eq!(tile_id(20, 0, 0), 366_503_875_925);
    }

    #[test]
    fn test_injective_and_dense() {
        for z in 1..=5u8 {
            let n = 1u32 << z;
            let base = zoom_base(z);
            let mut seen = HashSet::new();
            for x in 0..n {
                for y in 0..n {
                    let id = tile_id(z, x, y);
                    assert!(id >= base && id < zoom_base(z + 1));
                    assert!(seen.insert(id), "duplicate id {id} at z={z}");
                }
            }
            assert_eq!(seen.len() as u64, u64::from(n) * u64::from(n));
        }
    }

    #[test]
    fn test_curve_is_continuous() {
        // Consecutive Hilbert distances are always edge-adjacent cells.
        let z = 4u8;
        let n = 1u32 << z;
        let mut by_id = vec![(0u32, 0u32); (n * n) as usize];
        for x in 0..n {
            for y in 0..n {
                by_id[(tile_id(z, x, y) - zoom_base(z)) as usize] = (x, y);
            }
        }
        for pair in by_id.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let manhattan = a.0.abs_diff(b.0) + a.1.abs_diff(b.1);
            assert_eq!(manhattan, 1);
        }
    }

    #[test]
    fn test_max_zoom_corner() {
        let n = (1u64 << MAX_ZOOM) - 1;
        let id = tile_id(MAX_ZOOM, n as u32, 0);
        assert!(id >= zoom_base(MAX_ZOOM));
    }
}
