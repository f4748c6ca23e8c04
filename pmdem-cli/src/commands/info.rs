use anyhow::{Context, Result};
use pmdem::{Archive, ArchiveOptions};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct InfoResponse {
    path: String,
    file_size: u64,
    tile_type: &'static str,
    tile_compression: &'static str,
    internal_compression: &'static str,
    clustered: bool,
    min_zoom: u8,
    max_zoom: u8,
    bounds: [f64; 4],
    center: [f64; 2],
    center_zoom: u8,
    addressed_tiles: u64,
    tile_entries: u64,
    tile_contents: u64,
    root_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

pub fn run(archive_path: PathBuf, leaf_cache_size: u64, json: bool) -> Result<()> {
    let archive = Archive::open_with(&archive_path, ArchiveOptions { leaf_cache_size })
        .with_context(|| format!("Failed to open archive {}", archive_path.display()))?;
    let header = archive.header();

    let metadata = archive.metadata().context("Failed to read metadata")?;
    let metadata = if metadata.is_empty() {
        None
    } else {
        match serde_json::from_slice(&metadata) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "archive metadata is not valid JSON");
                None
            }
        }
    };

    let response = InfoResponse {
        path: archive_path.display().to_string(),
        file_size: archive.file_len(),
        tile_type: header.tile_type.name(),
        tile_compression: header.tile_compression.name(),
        internal_compression: header.internal_compression.name(),
        clustered: header.clustered,
        min_zoom: header.min_zoom,
        max_zoom: header.max_zoom,
        bounds: [
            header.bounds.min_lon,
            header.bounds.min_lat,
            header.bounds.max_lon,
            header.bounds.max_lat,
        ],
        center: [header.center_lon, header.center_lat],
        center_zoom: header.center_zoom,
        addressed_tiles: header.addressed_tiles,
        tile_entries: header.tile_entries,
        tile_contents: header.tile_contents,
        root_entries: archive.root().len(),
        metadata,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("Archive: {}", response.path);
    println!("File size: {}", format_size(response.file_size));
    println!();
    println!(
        "Tile type: {} (compression: {})",
        response.tile_type, response.tile_compression
    );
    println!("Directory compression: {}", response.internal_compression);
    println!("Clustered: {}", response.clustered);
    println!("Zoom: {}-{}", response.min_zoom, response.max_zoom);
    println!(
        "Bounds: {:.4},{:.4},{:.4},{:.4}",
        response.bounds[0], response.bounds[1], response.bounds[2], response.bounds[3]
    );
    println!(
        "Center: {:.4},{:.4} (zoom {})",
        response.center[0], response.center[1], response.center_zoom
    );
    println!();
    println!("Addressed tiles: {}", response.addressed_tiles);
    println!("Tile entries: {}", response.tile_entries);
    println!("Tile contents: {}", response.tile_contents);
    println!("Root directory entries: {}", response.root_entries);

    if let Some(metadata) = &response.metadata {
        println!();
        println!("Metadata:");
        println!("{}", serde_json::to_string_pretty(metadata)?);
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }
}
