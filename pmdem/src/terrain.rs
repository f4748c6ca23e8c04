//! Terrain-RGB decoding.
//!
//! Elevation tiles pack a height into the three 8-bit channels of an RGB
//! pixel. Two conventions are supported:
//!
//! - **Terrarium**: `r * 256 + g + b / 256 - 32768`
//! - **Mapbox**: `-10000 + (r * 65536 + g * 256 + b) * 0.1`

use std::fmt;
use std::str::FromStr;

use crate::error::PmdemError;

/// Terrain-RGB encoding convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerrainEncoding {
    #[default]
    Terrarium,
    Mapbox,
}

impl TerrainEncoding {
    /// Decode one RGB pixel into meters.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmdem::TerrainEncoding;
    ///
    /// assert_eq!(TerrainEncoding::Terrarium.decode(128, 0, 0), 0.0);
    /// assert_eq!(TerrainEncoding::Mapbox.decode(0, 0, 0), -10000.0);
    /// ```
    #[inline]
    pub fn decode(&self, r: u8, g: u8, b: u8) -> f64 {
        let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
        match self {
            TerrainEncoding::Terrarium => r * 256.0 + g + b / 256.0 - 32768.0,
            TerrainEncoding::Mapbox => -10000.0 + (r * 65536.0 + g * 256.0 + b) * 0.1,
        }
    }

    /// Lowercase name as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            TerrainEncoding::Terrarium => "terrarium",
            TerrainEncoding::Mapbox => "mapbox",
        }
    }
}

impl FromStr for TerrainEncoding {
    type Err = PmdemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "terrarium" => Ok(TerrainEncoding::Terrarium),
            "mapbox" => Ok(TerrainEncoding::Mapbox),
            _ => Err(PmdemError::UnknownEncoding {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TerrainEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrarium() {
        let t = TerrainEncoding::Terrarium;
        assert_eq!(t.decode(0, 0, 0), -32768.0);
        assert_eq!(t.decode(100, 0, 0), -7168.0);
        assert_eq!(t.decode(128, 0, 0), 0.0);
        assert_eq!(t.decode(128, 1, 128), 1.5);
        assert_eq!(t.decode(255, 255, 255), 32767.99609375);
    }

    #[test]
    fn test_mapbox() {
        let m = TerrainEncoding::Mapbox;
        assert_eq!(m.decode(0, 0, 0), -10000.0);
        // 100000 * 0.1 = 10000 -> sea level
        let v = m.decode(1, 134, 160);
        assert!((v - 0.0).abs() < 1e-9);
        assert!(m.decode(255, 255, 255) > 1_600_000.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "terrarium".parse::<TerrainEncoding>().unwrap(),
            TerrainEncoding::Terrarium
        );
        assert_eq!(
            "Mapbox".parse::<TerrainEncoding>().unwrap(),
            TerrainEncoding::Mapbox
        );
        assert!(matches!(
            "lerc".parse::<TerrainEncoding>(),
            Err(PmdemError::UnknownEncoding { .. })
        ));
    }

    #[test]
    fn test_display_roundtrip() {
        for enc in [TerrainEncoding::Terrarium, TerrainEncoding::Mapbox] {
            assert_eq!(enc.to_string().parse::<TerrainEncoding>().unwrap(), enc);
        }
    }
}
