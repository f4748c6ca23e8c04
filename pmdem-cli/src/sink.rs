//! Destinations for finished cell grids.

use anyhow::{Context, Result};
use clap::ValueEnum;
use pmdem::{Cell, OutputGrid, NODATA};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tiff::encoder::{colortype, compression::DeflateLevel, Compression, TiffEncoder};
use tiff::tags::{Predictor, Tag};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// Geographic lat/lon on WGS 84, pixels as areas.
const GEO_KEYS_EPSG_4326: [u16; 16] = [
    1, 1, 0, 3, // version, revision, key count
    1024, 0, 1, 2, // GTModelType = geographic
    1025, 0, 1, 1, // GTRasterType = pixel is area
    2048, 0, 1, 4326, // GeographicType = EPSG:4326
];

/// Output file format for generated cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// SRTM `.hgt`: raw big-endian i16
    Hgt,
    /// Deflate-compressed Int16 GeoTIFF (horizontal predictor) with Copernicus GLO-30 names
    Geotiff,
}

/// Receives one grid per generated cell.
pub trait GridSink {
    /// Persist `grid` for `cell`, returning where it went.
    fn write(&mut self, cell: Cell, grid: &OutputGrid) -> Result<PathBuf>;
}

/// Create the sink for `format`, creating `dir` if needed.
pub fn create(format: OutputFormat, dir: &Path) -> Result<Box<dyn GridSink>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let dir = dir.to_path_buf();
    Ok(match format {
        OutputFormat::Hgt => Box::new(HgtDirSink { dir }),
        OutputFormat::Geotiff => Box::new(GeoTiffDirSink { dir }),
    })
}

/// Writes SRTM-style `.hgt` files: big-endian `i16`, row-major, north row first.
pub struct HgtDirSink {
    dir: PathBuf,
}

impl GridSink for HgtDirSink {
    fn write(&mut self, cell: Cell, grid: &OutputGrid) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.hgt", cell.name()));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&grid.to_be_bytes())
            .and_then(|_| writer.flush())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Writes georeferenced single-band Int16 GeoTIFFs.
pub struct GeoTiffDirSink {
    dir: PathBuf,
}

/// Copernicus GLO-30 tile name, e.g. `Copernicus_DSM_COG_10_N35_00_E138_00_DEM`.
pub fn copernicus_name(cell: Cell) -> String {
    let ns = if cell.lat >= 0 { 'N' } else { 'S' };
    let ew = if cell.lon >= 0 { 'E' } else { 'W' };
    format!(
        "Copernicus_DSM_COG_10_{}{:02}_00_{}{:03}_00_DEM",
        ns,
        cell.lat.abs(),
        ew,
        cell.lon.abs()
    )
}

impl GridSink for GeoTiffDirSink {
    fn write(&mut self, cell: Cell, grid: &OutputGrid) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.tif", copernicus_name(cell)));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let side = u32::try_from(grid.side()).context("Grid too large for TIFF")?;
        let pixel_size = 1.0 / grid.side() as f64;
        let pixel_scale = [pixel_size, pixel_size, 0.0];
        let tiepoint = [
            0.0,
            0.0,
            0.0,
            f64::from(cell.lon),
            f64::from(cell.lat + 1),
            0.0,
        ];
        let nodata = NODATA.to_string();

        let mut encoder = TiffEncoder::new(BufWriter::new(file))?
            .with_predictor(Predictor::Horizontal)
            .with_compression(Compression::Deflate(DeflateLevel::default()));
        let mut image = encoder.new_image::<colortype::GrayI16>(side, side)?;
        let tags = image.encoder();
        tags.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &pixel_scale[..])?;
        tags.write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])?;
        tags.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &GEO_KEYS_EPSG_4326[..])?;
        tags.write_tag(Tag::Unknown(GDAL_NODATA), nodata.as_str())?;
        image
            .write_data(grid.samples())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tiff::decoder::{Decoder, DecodingResult};

    #[test]
    fn test_writes_big_endian_hgt() {
        let tmp = TempDir::new().unwrap();
        let mut sink = create(OutputFormat::Hgt, &tmp.path().join("out")).unwrap();

        let grid = OutputGrid::new(2);
        let path = sink.write(Cell::new(-13, -78), &grid).unwrap();

        assert_eq!(path.file_name().unwrap(), "S13W078.hgt");
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 8);
        // -32768 is 0x8000 big-endian
        assert_eq!(&bytes[..2], &[0x80, 0x00]);
    }

    #[test]
    fn test_copernicus_name() {
        assert_eq!(
            copernicus_name(Cell::new(35, 138)),
            "Copernicus_DSM_COG_10_N35_00_E138_00_DEM"
        );
        assert_eq!(
            copernicus_name(Cell::new(-1, -7)),
            "Copernicus_DSM_COG_10_S01_00_W007_00_DEM"
        );
    }

    #[test]
    fn test_writes_geotiff() {
        let tmp = TempDir::new().unwrap();
        let mut sink = create(OutputFormat::Geotiff, tmp.path()).unwrap();

        let grid = OutputGrid::new(4);
        let path = sink.write(Cell::new(46, 7), &grid).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "Copernicus_DSM_COG_10_N46_00_E007_00_DEM.tif"
        );

        let mut decoder = Decoder::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (4, 4));

        let tiepoint = decoder
            .get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT))
            .unwrap();
        assert_eq!(tiepoint[3], 7.0);
        assert_eq!(tiepoint[4], 47.0);
        let scale = decoder
            .get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE))
            .unwrap();
        assert_eq!(scale[0], 0.25);
        // Horizontal differencing
        assert_eq!(decoder.get_tag_u32(Tag::Predictor).unwrap(), 2);

        match decoder.read_image().unwrap() {
            DecodingResult::I16(samples) => assert_eq!(samples, grid.samples()),
            _ => panic!("expected Int16 samples"),
        }
    }

    #[test]
    fn test_unwritable_directory() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        assert!(create(OutputFormat::Hgt, &blocker.join("sub")).is_err());
    }
}
