use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pmdem::{
    cells_in_bounds, Archive, ArchiveOptions, Cell, CellOutcome, ImageRasterDecoder, Resampler,
    SamplingStrategy, TerrainEncoding, TileRasterCache,
};
use std::path::PathBuf;
use std::str::FromStr;

use crate::sink::{self, GridSink, OutputFormat};

/// `minlon,minlat,maxlon,maxlat` in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl FromStr for BoundingBox {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| format!("invalid bbox \"{s}\": {e}"))?;

        let [min_lon, min_lat, max_lon, max_lat] = values[..] else {
            return Err(format!(
                "invalid bbox \"{s}\": expected minlon,minlat,maxlon,maxlat"
            ));
        };
        if min_lon > max_lon || min_lat > max_lat {
            return Err(format!("invalid bbox \"{s}\": min exceeds max"));
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }
}

/// What happens to a generated cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Write,
    NoData,
    SeaLevel,
}

fn disposition(outcome: &CellOutcome, keep_sea_level: bool) -> Disposition {
    if outcome.all_no_data || outcome.grid.is_none() {
        Disposition::NoData
    } else if outcome.all_sea_level && !keep_sea_level {
        Disposition::SeaLevel
    } else {
        Disposition::Write
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    written: u64,
    no_data: u64,
    sea_level: u64,
}

/// Generate every cell in order; the first sink or decode error aborts the run.
fn process_cells(
    archive: &Archive,
    resampler: &Resampler,
    cells: &[Cell],
    sink: &mut dyn GridSink,
    keep_sea_level: bool,
    pb: &ProgressBar,
) -> Result<Summary> {
    let mut cache = TileRasterCache::new();
    let mut summary = Summary::default();

    for &cell in cells {
        pb.set_message(cell.name());
        let outcome = resampler
            .generate_cell(archive, cell, &mut cache, &ImageRasterDecoder)
            .with_context(|| format!("Failed to generate cell {}", cell))?;
        cache.clear();

        match disposition(&outcome, keep_sea_level) {
            Disposition::NoData => {
                tracing::debug!(%cell, "no data, skipping");
                summary.no_data += 1;
            }
            Disposition::SeaLevel => {
                tracing::debug!(%cell, "sea level only, skipping");
                summary.sea_level += 1;
            }
            Disposition::Write => {
                if let Some(grid) = &outcome.grid {
                    let path = sink
                        .write(cell, grid)
                        .with_context(|| format!("Failed to write cell {}", cell))?;
                    tracing::debug!(%cell, path = %path.display(), "wrote cell");
                    summary.written += 1;
                }
            }
        }
        pb.inc(1);
    }

    Ok(summary)
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    archive_path: PathBuf,
    leaf_cache_size: u64,
    output_dir: PathBuf,
    zoom: u8,
    encoding: TerrainEncoding,
    samples: usize,
    strategy: SamplingStrategy,
    format: OutputFormat,
    bbox: Option<BoundingBox>,
    keep_sea_level: bool,
) -> Result<()> {
    let resampler = Resampler::builder()
        .zoom(zoom)
        .encoding(encoding)
        .samples(samples)
        .strategy(strategy)
        .build()
        .context("Invalid resampler configuration")?;

    let archive = Archive::open_with(&archive_path, ArchiveOptions { leaf_cache_size })
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;

    let bounds = archive.header().bounds;
    let bbox = bbox.unwrap_or(BoundingBox {
        min_lon: bounds.min_lon,
        min_lat: bounds.min_lat,
        max_lon: bounds.max_lon,
        max_lat: bounds.max_lat,
    });
    let cells = cells_in_bounds(bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat);
    if cells.is_empty() {
        bail!("No cells intersect the requested bounds");
    }

    let mut sink = sink::create(format, &output_dir)?;

    tracing::info!(
        archive = %archive_path.display(),
        cells = cells.len(),
        zoom,
        encoding = %encoding,
        samples,
        strategy = %strategy,
        ?format,
        "generating cells"
    );

    let pb = ProgressBar::new(cells.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )?
            .progress_chars("#>-"),
    );

    let summary = process_cells(
        &archive,
        &resampler,
        &cells,
        sink.as_mut(),
        keep_sea_level,
        &pb,
    );
    pb.finish_and_clear();
    let summary = summary?;

    let stats = archive.cache_stats();
    tracing::info!(
        leaf_hits = stats.hit_count,
        leaf_misses = stats.miss_count,
        hit_rate = stats.hit_rate(),
        "leaf cache"
    );
    archive.close();

    println!("Cells written: {}", summary.written);
    println!("Cells without data: {}", summary.no_data);
    if !keep_sea_level {
        println!("Sea-level cells skipped: {}", summary.sea_level);
    }
    println!("Output directory: {}", output_dir.display());

    Ok(())
}
