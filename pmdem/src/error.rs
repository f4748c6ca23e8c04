//! Error types for the pmdem library.

use thiserror::Error;

/// Errors that can occur when reading archives or building elevation grids.
#[derive(Error, Debug)]
pub enum PmdemError {
    /// IO error when reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is smaller than the fixed archive header.
    #[error("Archive too short: {size} bytes (header needs 127)")]
    HeaderTooShort { size: usize },

    /// The first seven bytes are not the archive magic marker.
    #[error("Invalid archive magic")]
    InvalidMagic,

    /// Archive version other than 3.
    #[error("Unsupported archive version: {version} (expected 3)")]
    UnsupportedVersion { version: u8 },

    /// A varint ran off the end of its buffer before the terminating byte.
    #[error("Truncated varint at byte {offset}")]
    TruncatedVarint { offset: usize },

    /// A directory blob decoded into something inconsistent.
    #[error("Malformed directory: {reason}")]
    MalformedDirectory { reason: String },

    /// A byte range addressed by the header or a directory lies outside the file.
    #[error("Byte range {offset}+{length} exceeds archive size {file_len}")]
    RangeOutOfBounds {
        offset: u64,
        length: u64,
        file_len: u64,
    },

    /// Internal directory decompression failed.
    #[error("Decompression failed: {0}")]
    Decompress(std::io::Error),

    /// Terrain encoding name is not `terrarium` or `mapbox`.
    #[error("Unknown terrain encoding: {name} (expected \"terrarium\" or \"mapbox\")")]
    UnknownEncoding { name: String },

    /// Zoom level outside the addressable range.
    #[error("Invalid zoom level: {zoom} (valid: 0-31)")]
    InvalidZoom { zoom: u8 },

    /// Coordinates outside the valid geographic range.
    #[error("Coordinates out of bounds: lat={lat}, lon={lon} (valid: lat ±90°, lon ±180°)")]
    OutOfBounds { lat: f64, lon: f64 },

    /// A tile payload could not be decoded as an image.
    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Decoded tile is not square.
    #[error("Tile is not square: {width}x{height}")]
    NonSquareTile { width: u32, height: u32 },

    /// Decoded tile width differs from the archive's native width.
    #[error("Tile width {actual} does not match native tile width {expected}")]
    TileSizeMismatch { expected: u32, actual: u32 },

    /// Configuration value rejected.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Result type alias using [`PmdemError`].
pub type Result<T> = std::result::Result<T, PmdemError>;
