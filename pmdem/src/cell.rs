//! 1°×1° output cells and their names.
//!
//! A cell is identified by its **southwest corner** and named
//! `{N|S}{lat:02}{E|W}{lon:03}`, e.g. `N35E138` or `S13W078`.

use std::fmt;

/// A 1°×1° geographic cell, identified by its integer southwest corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub lat: i32,
    pub lon: i32,
}

impl Cell {
    pub fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    /// The cell containing a coordinate.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmdem::Cell;
    ///
    /// assert_eq!(Cell::containing(35.5, 138.7), Cell::new(35, 138));
    /// assert_eq!(Cell::containing(-12.3, -77.1), Cell::new(-13, -78));
    /// ```
    pub fn containing(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.floor() as i32,
            lon: lon.floor() as i32,
        }
    }

    /// Conventional name, e.g. `N35E138`.
    pub fn name(&self) -> String {
        let lat_prefix = if self.lat >= 0 { 'N' } else { 'S' };
        let lon_prefix = if self.lon >= 0 { 'E' } else { 'W' };

        format!(
            "{}{:02}{}{:03}",
            lat_prefix,
            self.lat.abs(),
            lon_prefix,
            self.lon.abs()
        )
    }

    /// Parse a cell name, with or without a leading path and file extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmdem::Cell;
    ///
    /// assert_eq!(Cell::from_name("N35E138"), Some(Cell::new(35, 138)));
    /// assert_eq!(Cell::from_name("out/S12W077.hgt"), Some(Cell::new(-12, -77)));
    /// assert_eq!(Cell::from_name("invalid"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let name = name.split('.').next().unwrap_or(name);

        if name.len() != 7 || !name.is_ascii() {
            return None;
        }
        let bytes = name.as_bytes();

        let lat_sign = match bytes[0] {
            b'N' | b'n' => 1,
            b'S' | b's' => -1,
            _ => return None,
        };
        let lat: i32 = name[1..3].parse().ok()?;

        let lon_sign = match bytes[3] {
            b'E' | b'e' => 1,
            b'W' | b'w' => -1,
            _ => return None,
        };
        let lon: i32 = name[4..7].parse().ok()?;

        Some(Self::new(lat * lat_sign, lon * lon_sign))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Every cell intersecting a bounding box, north to south, then west to east.
///
/// Bounds are clipped to ±90° latitude and ±180° longitude. A box with zero
/// width or height still yields the cells its edge lies in.
pub fn cells_in_bounds(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Vec<Cell> {
    let min_lat = min_lat.clamp(-90.0, 90.0);
    let max_lat = max_lat.clamp(-90.0, 90.0);
    let min_lon = min_lon.clamp(-180.0, 180.0);
    let max_lon = max_lon.clamp(-180.0, 180.0);
    if min_lat > max_lat || min_lon > max_lon {
        return Vec::new();
    }

    let lat_range = cell_span(min_lat, max_lat, 89);
    let lon_range = cell_span(min_lon, max_lon, 179);

    lat_range
        .rev()
        .flat_map(|lat| lon_range.clone().map(move |lon| Cell::new(lat, lon)))
        .collect()
}

/// Integer southwest corners covering `[min, max]` along one axis.
fn cell_span(min: f64, max: f64, last: i32) -> std::ops::RangeInclusive<i32> {
    let first = (min.floor() as i32).min(last);
    // A max exactly on a cell edge does not pull in the next cell.
    let end = if max.fract() == 0.0 && max > min {
        max as i32 - 1
    } else {
        max.floor() as i32
    };
    first..=end.clamp(first, last)
}
