//! Spherical Web-Mercator forward projection into fractional tile space.

use std::f64::consts::PI;

/// Latitude where the Mercator square ends: `atan(sinh(π))` in degrees.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_6;

/// Longitude to fractional tile column at `zoom`.
#[inline]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> f64 {
    (lon + 180.0) / 360.0 * tiles_per_axis(zoom)
}

/// Latitude to fractional tile row at `zoom` (row 0 is the northern edge).
#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> f64 {
    let lat_rad = lat.to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * tiles_per_axis(zoom)
}

/// Split a fractional tile coordinate into its tile index, clamped to the
/// zoom level's grid, and the offset from that index.
///
/// Past the grid edges the offset falls outside `[0, 1)`, so the pixel
/// lookup lands on the nearest edge row or column of the clamped tile.
#[inline]
pub fn split_tile(value: f64, zoom: u8) -> (u32, f64) {
    let max_index = tiles_per_axis(zoom) - 1.0;
    let index = value.floor().clamp(0.0, max_index);
    (index as u32, value - index)
}

/// `2^zoom` as a float.
#[inline]
fn tiles_per_axis(zoom: u8) -> f64 {
    (1u64 << zoom) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lon_edges() {
        assert_eq!(lon_to_tile_x(-180.0, 3), 0.0);
        assert_eq!(lon_to_tile_x(0.0, 3), 4.0);
        assert_eq!(lon_to_tile_x(180.0, 3), 8.0);
        assert_eq!(lon_to_tile_x(-90.0, 0), 0.25);
    }

    #[test]
    fn test_lat_equator_and_limits() {
        assert!((lat_to_tile_y(0.0, 4) - 8.0).abs() < 1e-12);
        assert!(lat_to_tile_y(MAX_MERCATOR_LAT, 4).abs() < 1e-9);
        assert!((lat_to_tile_y(-MAX_MERCATOR_LAT, 4) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_lat_symmetry_and_monotonic() {
        let z = 10;
        let n = 1024.0;
        let mut prev = f64::NEG_INFINITY;
        for i in -80..=80 {
            let lat = -(i as f64);
            let y = lat_to_tile_y(lat, z);
            assert!(y > prev, "row must grow southward");
            prev = y;
            let mirrored = lat_to_tile_y(-lat, z);
            assert!((y + mirrored - n).abs() < 1e-9);
        }
    }

    #[test]
    fn test_known_tile() {
        // San Francisco at zoom 12
        let x = lon_to_tile_x(-122.4194, 12);
        let y = lat_to_tile_y(37.7749, 12);
        assert_eq!(x.floor() as u32, 655);
        assert_eq!(y.floor() as u32, 1583);
    }

    #[test]
    fn test_split_tile() {
        assert_eq!(split_tile(3.25, 2), (3, 0.25));
        assert_eq!(split_tile(0.5, 2), (0, 0.5));
        // Past the eastern/southern edge: last tile, offset beyond 1
        assert_eq!(split_tile(4.25, 2), (3, 1.25));
        // Above the northern edge: first tile, negative offset
        assert_eq!(split_tile(-0.75, 2), (0, -0.75));
    }
}
