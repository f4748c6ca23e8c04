//! Resampling archive tiles onto regular latitude/longitude grids.
//!
//! This module provides [`Resampler`], which builds one [`OutputGrid`] per
//! 1°×1° [`Cell`] by projecting each output pixel center into Web-Mercator
//! tile space, fetching the tiles it lands in, and decoding the nearest
//! source pixel.
//!
//! Only the *distinct* tile rows and tile columns touched by the grid are
//! computed, so planning is linear in the grid side. Every tile of the cell
//! is fetched and decoded at most once and kept in a [`TileRasterCache`].
//!
//! # Strategies
//!
//! [`SamplingStrategy::Scalar`] is the reference: one lookup and one terrain
//! decode per output pixel. [`SamplingStrategy::Batched`] decodes each tile
//! row's elevation planes once and fills output rows with a gather over
//! precomputed column tables. Both produce identical grids.
//!
//! ```ignore
//! use pmdem::{Archive, Cell, ImageRasterDecoder, Resampler, TileRasterCache};
//!
//! let archive = Archive::open("terrain.pmtiles")?;
//! let resampler = Resampler::builder().zoom(12).build()?;
//! let mut cache = TileRasterCache::new();
//!
//! let outcome = resampler.generate_cell(&archive, Cell::new(46, 7), &mut cache, &ImageRasterDecoder)?;
//! cache.clear();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::archive::Archive;
use crate::cell::Cell;
use crate::error::{PmdemError, Result};
use crate::grid::{CellOutcome, OutputGrid};
use crate::hilbert::MAX_ZOOM;
use crate::projection::{lat_to_tile_y, lon_to_tile_x, split_tile};
use crate::raster::{RasterDecoder, RgbRaster};
use crate::terrain::TerrainEncoding;

/// Default output grid side length (1 arc-second).
pub const DEFAULT_SAMPLES: usize = 3600;

/// Default source zoom level.
pub const DEFAULT_ZOOM: u8 = 12;

/// How output pixels are filled from cached tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingStrategy {
    /// One lookup per output pixel.
    #[default]
    Scalar,
    /// Row-at-a-time gather over pre-decoded elevation planes.
    Batched,
}

impl SamplingStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            SamplingStrategy::Scalar => "scalar",
            SamplingStrategy::Batched => "batched",
        }
    }
}

impl FromStr for SamplingStrategy {
    type Err = PmdemError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "scalar" => Ok(SamplingStrategy::Scalar),
            "batched" => Ok(SamplingStrategy::Batched),
            _ => Err(PmdemError::InvalidConfig {
                reason: format!("unknown sampling strategy \"{s}\" (expected scalar or batched)"),
            }),
        }
    }
}

impl fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded tiles for one cell at a fixed zoom.
///
/// A tile key maps to `None` when the archive has no tile there. The native
/// tile width is a property of the whole archive and survives [`clear`].
///
/// [`clear`]: TileRasterCache::clear
#[derive(Debug, Default)]
pub struct TileRasterCache {
    tiles: HashMap<(u32, u32), Option<RgbRaster>>,
    native_tile_width: Option<u32>,
}

impl TileRasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry for tile `(x, y)`: `None` if never fetched,
    /// `Some(None)` if known absent.
    pub fn get(&self, x: u32, y: u32) -> Option<Option<&RgbRaster>> {
        self.tiles.get(&(x, y)).map(Option::as_ref)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.tiles.contains_key(&(x, y))
    }

    /// Remember that tile `(x, y)` is absent.
    pub fn insert_absent(&mut self, x: u32, y: u32) {
        self.tiles.insert((x, y), None);
    }

    /// Store a decoded tile, fixing the native width on first use.
    ///
    /// # Errors
    ///
    /// [`PmdemError::NonSquareTile`] or [`PmdemError::TileSizeMismatch`].
    pub fn insert_raster(&mut self, x: u32, y: u32, raster: RgbRaster) -> Result<()> {
        if raster.width() != raster.height() {
            return Err(PmdemError::NonSquareTile {
                width: raster.width(),
                height: raster.height(),
            });
        }
        match self.native_tile_width {
            Some(expected) if expected != raster.width() => {
                return Err(PmdemError::TileSizeMismatch {
                    expected,
                    actual: raster.width(),
                });
            }
            Some(_) => {}
            None => self.native_tile_width = Some(raster.width()),
        }
        self.tiles.insert((x, y), Some(raster));
        Ok(())
    }

    /// Width in pixels of the first tile ever decoded.
    pub fn native_tile_width(&self) -> Option<u32> {
        self.native_tile_width
    }

    /// Number of cached entries, absent markers included.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Drop every tile but keep the native tile width.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    fn raster(&self, x: u32, y: u32) -> Option<&RgbRaster> {
        self.tiles.get(&(x, y)).and_then(Option::as_ref)
    }
}

/// Where one output row or column lands in tile space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisSample {
    tile: u32,
    fraction: f64,
}

/// Per-axis projections and the distinct tiles they touch.
#[derive(Debug)]
struct CellPlan {
    rows: Vec<AxisSample>,
    cols: Vec<AxisSample>,
    tile_xs: Vec<u32>,
    tile_ys: Vec<u32>,
}

impl CellPlan {
    fn new(cell: Cell, side: usize, zoom: u8) -> Self {
        let step = side as f64;
        let north = f64::from(cell.lat) + 1.0;
        let west = f64::from(cell.lon);

        let rows: Vec<AxisSample> = (0..side)
            .map(|r| {
                let lat = north - (r as f64 + 0.5) / step;
                let (tile, fraction) = split_tile(lat_to_tile_y(lat, zoom), zoom);
                AxisSample { tile, fraction }
            })
            .collect();
        let cols: Vec<AxisSample> = (0..side)
            .map(|c| {
                let lon = west + (c as f64 + 0.5) / step;
                let (tile, fraction) = split_tile(lon_to_tile_x(lon, zoom), zoom);
                AxisSample { tile, fraction }
            })
            .collect();

        Self {
            tile_xs: distinct_tiles(&cols),
            tile_ys: distinct_tiles(&rows),
            rows,
            cols,
        }
    }

    fn tile_pairs(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.tile_ys
            .iter()
            .flat_map(move |&y| self.tile_xs.iter().map(move |&x| (x, y)))
    }
}

fn distinct_tiles(samples: &[AxisSample]) -> Vec<u32> {
    let mut tiles: Vec<u32> = samples.iter().map(|s| s.tile).collect();
    tiles.sort_unstable();
    tiles.dedup();
    tiles
}

/// Nearest source pixel for an in-tile fraction.
#[inline]
fn pixel_index(fraction: f64, width: usize) -> usize {
    let max = width.saturating_sub(1) as f64;
    (fraction * max).round_ties_even().clamp(0.0, max) as usize
}

/// Round meters to the nearest representable sample.
#[inline]
fn to_sample(elevation: f64) -> i16 {
    elevation
        .round_ties_even()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Running "any real data / anything above sea level" tracker.
///
/// Works on decoded elevations before rounding, so a pixel at 0.3 m keeps
/// the cell out of the sea-level class even though it is written as 0.
#[derive(Debug, Clone, Copy)]
struct Coverage {
    any: bool,
    above_sea_level: bool,
}

impl Coverage {
    fn new() -> Self {
        Self {
            any: false,
            above_sea_level: false,
        }
    }

    #[inline]
    fn record(&mut self, elevation: f64) {
        self.any = true;
        self.above_sea_level |= elevation > 0.0;
    }

    fn apply(self, grid: &mut OutputGrid) {
        grid.all_no_data = !self.any;
        grid.all_sea_level = self.any && !self.above_sea_level;
    }
}

/// Builds elevation grids from an archive.
#[derive(Debug, Clone)]
pub struct Resampler {
    zoom: u8,
    encoding: TerrainEncoding,
    samples: usize,
    strategy: SamplingStrategy,
}

impl Resampler {
    /// Create a builder with default settings.
    pub fn builder() -> ResamplerBuilder {
        ResamplerBuilder::new()
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn encoding(&self) -> TerrainEncoding {
        self.encoding
    }

    /// Output grid side length.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// Build the elevation grid for one cell.
    ///
    /// Fetches and decodes every tile the cell touches that is not already in
    /// `cache`, then samples. The cache is left populated; callers clear it
    /// between cells to bound memory.
    ///
    /// # Returns
    ///
    /// A [`CellOutcome`] whose grid is `None` (and `all_no_data` set) when none
    /// of the touched tiles exists in the archive.
    ///
    /// # Errors
    ///
    /// Archive corruption, undecodable tile payloads, or tiles whose size
    /// differs from the native tile width.
    pub fn generate_cell(
        &self,
        archive: &Archive,
        cell: Cell,
        cache: &mut TileRasterCache,
        decoder: &dyn RasterDecoder,
    ) -> Result<CellOutcome> {
        let plan = CellPlan::new(cell, self.samples, self.zoom);

        let mut fetched = 0usize;
        let mut absent = 0usize;
        for (x, y) in plan.tile_pairs() {
            if cache.contains(x, y) {
                continue;
            }
            match archive.get(self.zoom, x, y)? {
                Some(bytes) => {
                    let raster = decoder.decode(bytes)?;
                    cache.insert_raster(x, y, raster)?;
                    fetched += 1;
                }
                None => {
                    cache.insert_absent(x, y);
                    absent += 1;
                }
            }
        }
        tracing::debug!(
            %cell,
            tile_columns = plan.tile_xs.len(),
            tile_rows = plan.tile_ys.len(),
            fetched,
            absent,
            "fetched tiles"
        );

        self.sample_plan(&plan, cache)
    }

    /// Sample a cell from an already populated cache.
    ///
    /// Tiles missing from the cache are treated as absent.
    pub fn sample(&self, cell: Cell, cache: &TileRasterCache) -> Result<CellOutcome> {
        let plan = CellPlan::new(cell, self.samples, self.zoom);
        self.sample_plan(&plan, cache)
    }

    fn sample_plan(&self, plan: &CellPlan, cache: &TileRasterCache) -> Result<CellOutcome> {
        let any_tile = plan.tile_pairs().any(|(x, y)| cache.raster(x, y).is_some());
        let width = match cache.native_tile_width() {
            Some(w) if any_tile => w as usize,
            _ => return Ok(CellOutcome::empty()),
        };

        let mut grid = OutputGrid::new(self.samples);
        let coverage = match self.strategy {
            SamplingStrategy::Scalar => self.fill_scalar(plan, cache, width, &mut grid),
            SamplingStrategy::Batched => self.fill_batched(plan, cache, width, &mut grid),
        };
        coverage.apply(&mut grid);

        Ok(CellOutcome::from_grid(grid))
    }

    fn fill_scalar(
        &self,
        plan: &CellPlan,
        cache: &TileRasterCache,
        width: usize,
        grid: &mut OutputGrid,
    ) -> Coverage {
        let side = self.samples;
        let samples = grid.samples_mut();
        let mut coverage = Coverage::new();

        for (r, row) in plan.rows.iter().enumerate() {
            let py = pixel_index(row.fraction, width);
            for (c, col) in plan.cols.iter().enumerate() {
                let Some(raster) = cache.raster(col.tile, row.tile) else {
                    continue;
                };
                let px = pixel_index(col.fraction, width);
                let [red, green, blue] = raster.rgb(px, py);
                let elevation = self.encoding.decode(red, green, blue);
                samples[r * side + c] = to_sample(elevation);
                coverage.record(elevation);
            }
        }

        coverage
    }

    fn fill_batched(
        &self,
        plan: &CellPlan,
        cache: &TileRasterCache,
        width: usize,
        grid: &mut OutputGrid,
    ) -> Coverage {
        let side = self.samples;
        let col_px: Vec<usize> = plan
            .cols
            .iter()
            .map(|c| pixel_index(c.fraction, width))
            .collect();
        let col_runs = runs(&plan.cols);
        let row_runs = runs(&plan.rows);

        let samples = grid.samples_mut();
        let mut coverage = Coverage::new();

        for (tile_y, row_start, row_end) in row_runs {
            // Elevation planes for every tile column in this tile row.
            let planes: Vec<Option<Vec<f64>>> = col_runs
                .iter()
                .map(|&(tile_x, _, _)| {
                    cache
                        .raster(tile_x, tile_y)
                        .map(|raster| self.elevation_plane(raster))
                })
                .collect();

            for r in row_start..row_end {
                let py = pixel_index(plan.rows[r].fraction, width);
                let out_row = &mut samples[r * side..(r + 1) * side];

                for (plane, &(_, col_start, col_end)) in planes.iter().zip(&col_runs) {
                    let Some(plane) = plane else {
                        continue;
                    };
                    let source = &plane[py * width..(py + 1) * width];
                    let out = &mut out_row[col_start..col_end];
                    let mut max = f64::NEG_INFINITY;
                    for (o, &px) in out.iter_mut().zip(&col_px[col_start..col_end]) {
                        let elevation = source[px];
                        *o = to_sample(elevation);
                        max = max.max(elevation);
                    }
                    if !out.is_empty() {
                        coverage.record(max);
                    }
                }
            }
        }

        coverage
    }

    /// Every pixel of a tile decoded to meters.
    fn elevation_plane(&self, raster: &RgbRaster) -> Vec<f64> {
        raster
            .pixels()
            .chunks_exact(3)
            .map(|p| self.encoding.decode(p[0], p[1], p[2]))
            .collect()
    }

    /// Nearest-neighbour elevation at a single coordinate.
    ///
    /// Uses the same projection, pixel selection, rounding and clamping as
    /// grid generation.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(elevation))` - elevation in meters
    /// - `Ok(None)` - no tile covers the coordinate
    /// - `Err(...)` - coordinates out of range, corrupt archive or tile
    pub fn elevation_at(
        &self,
        archive: &Archive,
        decoder: &dyn RasterDecoder,
        lat: f64,
        lon: f64,
    ) -> Result<Option<i16>> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(PmdemError::OutOfBounds { lat, lon });
        }

        let (tile_x, fx) = split_tile(lon_to_tile_x(lon, self.zoom), self.zoom);
        let (tile_y, fy) = split_tile(lat_to_tile_y(lat, self.zoom), self.zoom);

        let Some(bytes) = archive.get(self.zoom, tile_x, tile_y)? else {
            return Ok(None);
        };
        let raster = decoder.decode(bytes)?;
        if raster.width() != raster.height() {
            return Err(PmdemError::NonSquareTile {
                width: raster.width(),
                height: raster.height(),
            });
        }

        let width = raster.width() as usize;
        let [red, green, blue] = raster.rgb(pixel_index(fx, width), pixel_index(fy, width));
        Ok(Some(to_sample(self.encoding.decode(red, green, blue))))
    }
}

/// Contiguous runs of equal tile index as `(tile, start, end)`.
fn runs(samples: &[AxisSample]) -> Vec<(u32, usize, usize)> {
    let mut out: Vec<(u32, usize, usize)> = Vec::new();
    for (i, s) in samples.iter().enumerate() {
        match out.last_mut() {
            Some(run) if run.0 == s.tile => run.2 = i + 1,
            _ => out.push((s.tile, i, i + 1)),
        }
    }
    out
}

/// Builder for [`Resampler`].
///
/// # Example
///
/// ```
/// use pmdem::{Resampler, SamplingStrategy, TerrainEncoding};
///
/// let resampler = Resampler::builder()
///     .zoom(11)
///     .encoding(TerrainEncoding::Mapbox)
///     .samples(1201)
///     .strategy(SamplingStrategy::Batched)
///     .build()
///     .unwrap();
/// assert_eq!(resampler.samples(), 1201);
/// ```
#[derive(Debug, Clone)]
pub struct ResamplerBuilder {
    zoom: u8,
    encoding: TerrainEncoding,
    samples: usize,
    strategy: SamplingStrategy,
}

impl Default for ResamplerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResamplerBuilder {
    /// Create a builder with the default zoom (12), terrarium encoding,
    /// 3600 samples and scalar sampling.
    pub fn new() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            encoding: TerrainEncoding::Terrarium,
            samples: DEFAULT_SAMPLES,
            strategy: SamplingStrategy::Scalar,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `PMDEM_ZOOM` | Source zoom level | 12 |
    /// | `PMDEM_ENCODING` | `terrarium` or `mapbox` | terrarium |
    /// | `PMDEM_SAMPLES` | Output grid side length | 3600 |
    /// | `PMDEM_STRATEGY` | `scalar` or `batched` | scalar |
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::new();

        if let Ok(zoom) = std::env::var("PMDEM_ZOOM") {
            builder.zoom = zoom.trim().parse().map_err(|_| PmdemError::InvalidConfig {
                reason: format!("PMDEM_ZOOM is not a zoom level: {zoom}"),
            })?;
        }
        if let Ok(encoding) = std::env::var("PMDEM_ENCODING") {
            builder.encoding = encoding.parse()?;
        }
        if let Ok(samples) = std::env::var("PMDEM_SAMPLES") {
            builder.samples = samples
                .trim()
                .parse()
                .map_err(|_| PmdemError::InvalidConfig {
                    reason: format!("PMDEM_SAMPLES is not a positive integer: {samples}"),
                })?;
        }
        if let Ok(strategy) = std::env::var("PMDEM_STRATEGY") {
            builder.strategy = strategy.parse()?;
        }

        Ok(builder)
    }

    /// Set the source zoom level.
    pub fn zoom(mut self, zoom: u8) -> Self {
        self.zoom = zoom;
        self
    }

    /// Set the terrain encoding.
    pub fn encoding(mut self, encoding: TerrainEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the output grid side length.
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Set the sampling strategy.
    pub fn strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Build the [`Resampler`].
    ///
    /// # Errors
    ///
    /// Returns an error if the zoom is above 31 or the side length is zero.
    pub fn build(self) -> Result<Resampler> {
        if self.zoom > MAX_ZOOM {
            return Err(PmdemError::InvalidZoom { zoom: self.zoom });
        }
        if self.samples == 0 {
            return Err(PmdemError::InvalidConfig {
                reason: "grid side length must be at least 1".to_string(),
            });
        }
        Ok(Resampler {
            zoom: self.zoom,
            encoding: self.encoding,
            samples: self.samples,
            strategy: self.strategy,
        })
    }
}
