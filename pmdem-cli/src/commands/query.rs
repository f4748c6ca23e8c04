use anyhow::{Context, Result};
use pmdem::{Archive, ArchiveOptions, ImageRasterDecoder, Resampler, TerrainEncoding};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ElevationResponse {
    lat: f64,
    lon: f64,
    zoom: u8,
    encoding: &'static str,
    elevation: Option<i16>,
}

pub fn run(
    archive_path: PathBuf,
    leaf_cache_size: u64,
    lat: f64,
    lon: f64,
    zoom: u8,
    encoding: TerrainEncoding,
    json: bool,
) -> Result<()> {
    let resampler = Resampler::builder()
        .zoom(zoom)
        .encoding(encoding)
        .build()
        .context("Invalid resampler configuration")?;

    let archive = Archive::open_with(&archive_path, ArchiveOptions { leaf_cache_size })
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;

    let elevation = resampler
        .elevation_at(&archive, &ImageRasterDecoder, lat, lon)
        .context("Failed to get elevation")?;

    if json {
        let response = ElevationResponse {
            lat,
            lon,
            zoom,
            encoding: encoding.name(),
            elevation,
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        match elevation {
            Some(elev) => println!("{}", elev),
            None => println!("void"),
        }
    }

    Ok(())
}
