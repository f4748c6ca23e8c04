//! # pmdem - Terrain Tile Archive Resampler
//!
//! Reads single-file tile archives (PMTiles v3) of Terrain-RGB elevation
//! tiles and resamples them onto regular 1°×1° latitude/longitude grids of
//! 16-bit samples, the layout used by SRTM `.hgt` files.
//!
//! ## Features
//!
//! - **Zero-copy reads**: the archive is memory-mapped, tile payloads are borrowed slices
//! - **Leaf cache**: decoded leaf directories are cached across lookups
//! - **Linear planning**: only the distinct tile rows and columns of a cell are projected
//! - **Two strategies**: a scalar reference path and a batched row-gather path
//!
//! ## Quick Start
//!
//! ```ignore
//! use pmdem::{Archive, Cell, ImageRasterDecoder, Resampler, TileRasterCache};
//!
//! let archive = Archive::open("terrain.pmtiles")?;
//! let resampler = Resampler::builder().zoom(12).samples(3601).build()?;
//! let mut cache = TileRasterCache::new();
//!
//! let outcome = resampler.generate_cell(&archive, Cell::new(35, 138), &mut cache, &ImageRasterDecoder)?;
//! if let Some(grid) = outcome.grid {
//!     std::fs::write("N35E138.hgt", grid.to_be_bytes())?;
//! }
//! ```
//!
//! ## Terrain Encodings
//!
//! - **Terrarium**: `r·256 + g + b/256 − 32768`
//! - **Mapbox**: `−10000 + (r·65536 + g·256 + b)·0.1`
//!
//! Output samples are rounded to the nearest integer (ties to even) and
//! clamped to the `i16` range. `-32768` marks samples with no source tile.

pub mod archive;
pub mod cell;
pub mod directory;
pub mod error;
pub mod grid;
pub mod header;
pub mod hilbert;
pub mod projection;
pub mod raster;
pub mod resample;
pub mod terrain;
pub mod varint;

// Re-export main types at crate root for convenience
pub use archive::{Archive, ArchiveOptions, CacheStats, TileLookup, TileRange};
pub use cell::{cells_in_bounds, Cell};
pub use error::{PmdemError, Result};
pub use grid::{CellOutcome, OutputGrid, NODATA};
pub use header::{Bounds, Compression, Header, TileType};
pub use raster::{ImageRasterDecoder, RasterDecoder, RgbRaster};
pub use resample::{Resampler, ResamplerBuilder, SamplingStrategy, TileRasterCache};
pub use terrain::TerrainEncoding;
