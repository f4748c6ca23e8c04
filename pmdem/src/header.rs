//! Fixed 127-byte archive header.
//!
//! | Bytes   | Field                                              |
//! |---------|----------------------------------------------------|
//! | 0-6     | magic `PMTiles`                                    |
//! | 7       | version (must be 3)                                |
//! | 8-95    | eleven little-endian `u64` section offsets/counts  |
//! | 96      | clustered flag                                     |
//! | 97      | internal (directory/metadata) compression          |
//! | 98      | tile compression                                   |
//! | 99      | tile type                                          |
//! | 100-101 | min zoom, max zoom                                 |
//! | 102-117 | min lon, min lat, max lon, max lat (`i32` × 1e7)   |
//! | 118     | center zoom                                        |
//! | 119-126 | center lon, center lat (`i32` × 1e7)               |

use std::io::Read;

use flate2::read::GzDecoder;

use crate::error::{PmdemError, Result};

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 127;

/// Magic marker at the start of every archive.
pub const MAGIC: &[u8; 7] = b"PMTiles";

/// The only archive version this crate reads.
pub const VERSION: u8 = 3;

/// Compression applied to directories, metadata or tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Unknown,
    None,
    Gzip,
    Brotli,
    Zstd,
}

impl Compression {
    fn from_byte(b: u8) -> Self {
        match b {
            1 => Compression::None,
            2 => Compression::Gzip,
            3 => Compression::Brotli,
            4 => Compression::Zstd,
            _ => Compression::Unknown,
        }
    }

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Compression::Unknown => "unknown",
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Brotli => "brotli",
            Compression::Zstd => "zstd",
        }
    }

    /// Undo this compression.
    ///
    /// Only gzip is inflated; every other kind is returned as-is.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::Gzip => {
                let mut decoder = GzDecoder::new(data);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(PmdemError::Decompress)?;
                Ok(out)
            }
            _ => Ok(data.to_vec()),
        }
    }
}

/// Tile payload format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileType {
    Unknown,
    Mvt,
    Png,
    Jpeg,
    Webp,
    Avif,
}

impl TileType {
    fn from_byte(b: u8) -> Self {
        match b {
            1 => TileType::Mvt,
            2 => TileType::Png,
            3 => TileType::Jpeg,
            4 => TileType::Webp,
            5 => TileType::Avif,
            _ => TileType::Unknown,
        }
    }

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            TileType::Unknown => "unknown",
            TileType::Mvt => "mvt",
            TileType::Png => "png",
            TileType::Jpeg => "jpeg",
            TileType::Webp => "webp",
            TileType::Avif => "avif",
        }
    }
}

/// Geographic bounds in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// Parsed archive header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub root_offset: u64,
    pub root_length: u64,
    pub metadata_offset: u64,
    pub metadata_length: u64,
    pub leaf_offset: u64,
    pub leaf_length: u64,
    pub data_offset: u64,
    pub data_length: u64,
    pub addressed_tiles: u64,
    pub tile_entries: u64,
    pub tile_contents: u64,
    pub clustered: bool,
    pub internal_compression: Compression,
    pub tile_compression: Compression,
    pub tile_type: TileType,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub bounds: Bounds,
    pub center_zoom: u8,
    pub center_lon: f64,
    pub center_lat: f64,
}

impl Header {
    /// Parse the header from the first bytes of an archive.
    ///
    /// # Errors
    ///
    /// Fails if fewer than 127 bytes are given, the magic does not match, or
    /// the version is not 3.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(PmdemError::HeaderTooShort { size: buf.len() });
        }
        if &buf[0..7] != MAGIC {
            return Err(PmdemError::InvalidMagic);
        }
        if buf[7] != VERSION {
            return Err(PmdemError::UnsupportedVersion { version: buf[7] });
        }

        let u64_at = |field: usize| {
            let start = 8 + field * 8;
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[start..start + 8]);
            u64::from_le_bytes(bytes)
        };
        let degrees_at = |start: usize| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&buf[start..start + 4]);
            f64::from(i32::from_le_bytes(bytes)) / 10_000_000.0
        };

        Ok(Self {
            root_offset: u64_at(0),
            root_length: u64_at(1),
            metadata_offset: u64_at(2),
            metadata_length: u64_at(3),
            leaf_offset: u64_at(4),
            leaf_length: u64_at(5),
            data_offset: u64_at(6),
            data_length: u64_at(7),
            addressed_tiles: u64_at(8),
            tile_entries: u64_at(9),
            tile_contents: u64_at(10),
            clustered: buf[96] == 1,
            internal_compression: Compression::from_byte(buf[97]),
            tile_compression: Compression::from_byte(buf[98]),
            tile_type: TileType::from_byte(buf[99]),
            min_zoom: buf[100],
            max_zoom: buf[101],
            bounds: Bounds {
                min_lon: degrees_at(102),
                min_lat: degrees_at(106),
                max_lon: degrees_at(110),
                max_lat: degrees_at(114),
            },
            center_zoom: buf[118],
            center_lon: degrees_at(119),
            center_lat: degrees_at(123),
        })
    }

    /// Serialize back into the 127-byte layout.
    #[cfg(test)]
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let compression_byte = |c: Compression| match c {
            Compression::Unknown => 0u8,
            Compression::None => 1,
            Compression::Gzip => 2,
            Compression::Brotli => 3,
            Compression::Zstd => 4,
        };
        let tile_type_byte = match self.tile_type {
            TileType::Unknown => 0u8,
            TileType::Mvt => 1,
            TileType::Png => 2,
            TileType::Jpeg => 3,
            TileType::Webp => 4,
            TileType::Avif => 5,
        };
        let e7 = |deg: f64| ((deg * 10_000_000.0).round() as i32).to_le_bytes();

        let mut buf = Vec::with_capacity(HEADER_LEN);
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        for v in [
            self.root_offset,
            self.root_length,
            self.metadata_offset,
            self.metadata_length,
            self.leaf_offset,
            self.leaf_length,
            self.data_offset,
            self.data_length,
            self.addressed_tiles,
            self.tile_entries,
            self.tile_contents,
        ] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.push(u8::from(self.clustered));
        buf.push(compression_byte(self.internal_compression));
        buf.push(compression_byte(self.tile_compression));
        buf.push(tile_type_byte);
        buf.push(self.min_zoom);
        buf.push(self.max_zoom);
        buf.extend_from_slice(&e7(self.bounds.min_lon));
        buf.extend_from_slice(&e7(self.bounds.min_lat));
        buf.extend_from_slice(&e7(self.bounds.max_lon));
        buf.extend_from_slice(&e7(self.bounds.max_lat));
        buf.push(self.center_zoom);
        buf.extend_from_slice(&e7(self.center_lon));
        buf.extend_from_slice(&e7(self.center_lat));
        debug_assert_eq!(buf.len(), HEADER_LEN);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn sample_header() -> Header {
        Header {
            root_offset: 127,
            root_length: 40,
            metadata_offset: 167,
            metadata_length: 0,
            leaf_offset: 167,
            leaf_length: 0,
            data_offset: 167,
            data_length: 1000,
            addressed_tiles: 4,
            tile_entries: 4,
            tile_contents: 4,
            clustered: true,
            internal_compression: Compression::Gzip,
            tile_compression: Compression::None,
            tile_type: TileType::Png,
            min_zoom: 0,
            max_zoom: 12,
            bounds: Bounds {
                min_lon: -122.5,
                min_lat: 37.25,
                max_lon: -121.75,
                max_lat: 38.0,
            },
            center_zoom: 8,
            center_lon: -122.125,
            center_lat: 37.625,
        }
    }

    #[test]
    fn test_parse_valid_header() {
        let header = sample_header();
        let parsed = Header::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_field_positions() {
        let bytes = sample_header().to_bytes();
        assert_eq!(&bytes[0..7], b"PMTiles");
        assert_eq!(bytes[7], 3);
        assert_eq!(u64::from_le_bytes(bytes[8..16].try_into().unwrap()), 127);
        assert_eq!(u64::from_le_bytes(bytes[40..48].try_into().unwrap()), 167);
        assert_eq!(bytes[97], 2);
        assert_eq!(bytes[100], 0);
        assert_eq!(bytes[101], 12);
        assert_eq!(
            i32::from_le_bytes(bytes[102..106].try_into().unwrap()),
            -1_225_000_000
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample_header().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(Header::parse(&bytes), Err(PmdemError::InvalidMagic)));
    }

    #[test]
    fn test_bad_version() {
        let mut bytes = sample_header().to_bytes();
        bytes[7] = 2;
        assert!(matches!(
            Header::parse(&bytes),
            Err(PmdemError::UnsupportedVersion { version: 2 })
        ));
    }

    #[test]
    fn test_short_buffer() {
        let bytes = sample_header().to_bytes();
        assert!(matches!(
            Header::parse(&bytes[..100]),
            Err(PmdemError::HeaderTooShort { size: 100 })
        ));
    }

    #[test]
    fn test_unknown_compression_byte() {
        let mut bytes = sample_header().to_bytes();
        bytes[97] = 9;
        let header = Header::parse(&bytes).unwrap();
        assert_eq!(header.internal_compression, Compression::Unknown);
    }

    #[test]
    fn test_gzip_decompress() {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"directory bytes").unwrap();
        let compressed = encoder.finish().unwrap();

        let out = Compression::Gzip.decompress(&compressed).unwrap();
        assert_eq!(out, b"directory bytes");
    }

    #[test]
    fn test_other_compressions_pass_through() {
        for c in [
            Compression::None,
            Compression::Unknown,
            Compression::Brotli,
            Compression::Zstd,
        ] {
            assert_eq!(c.decompress(b"raw").unwrap(), b"raw");
        }
    }

    #[test]
    fn test_corrupt_gzip() {
        let result = Compression::Gzip.decompress(&[0x1f, 0x8b, 0x00, 0x01]);
        assert!(matches!(result, Err(PmdemError::Decompress(_))));
    }
}
