use anyhow::Result;
use clap::{Parser, Subcommand};
use pmdem::{SamplingStrategy, TerrainEncoding};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod sink;

use commands::generate::BoundingBox;
use sink::OutputFormat;

/// Extract elevation grids from terrain tile archives
#[derive(Parser)]
#[command(name = "pmdem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Maximum leaf directories kept in cache
    #[arg(
        long,
        env = "PMDEM_LEAF_CACHE_SIZE",
        default_value = "1024",
        global = true
    )]
    leaf_cache_size: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display header and metadata of an archive
    Info {
        /// Path to the .pmtiles archive
        archive: PathBuf,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Query elevation for a single coordinate
    Query {
        /// Path to the .pmtiles archive
        archive: PathBuf,

        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Source zoom level
        #[arg(short, long, env = "PMDEM_ZOOM", default_value = "12")]
        zoom: u8,

        /// Terrain encoding (terrarium or mapbox)
        #[arg(short, long, env = "PMDEM_ENCODING", default_value = "terrarium")]
        encoding: TerrainEncoding,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Write one elevation grid per 1°×1° cell covered by the archive
    Generate {
        /// Path to the .pmtiles archive
        archive: PathBuf,

        /// Directory receiving the generated grid files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Source zoom level
        #[arg(short, long, env = "PMDEM_ZOOM", default_value = "12")]
        zoom: u8,

        /// Terrain encoding (terrarium or mapbox)
        #[arg(short, long, env = "PMDEM_ENCODING", default_value = "terrarium")]
        encoding: TerrainEncoding,

        /// Output grid side length
        #[arg(short, long, env = "PMDEM_SAMPLES", default_value = "3600")]
        samples: usize,

        /// Sampling strategy (scalar or batched)
        #[arg(long, env = "PMDEM_STRATEGY", default_value = "scalar")]
        strategy: SamplingStrategy,

        /// Output file format
        #[arg(short, long, value_enum, default_value = "hgt")]
        format: OutputFormat,

        /// Restrict to minlon,minlat,maxlon,maxlat instead of the archive bounds
        #[arg(long, allow_hyphen_values = true)]
        bbox: Option<BoundingBox>,

        /// Also write cells whose samples are all at or below 0 m
        #[arg(long)]
        keep_sea_level: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pmdem=info,pmdem_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { archive, json } => commands::info::run(archive, cli.leaf_cache_size, json),
        Commands::Query {
            archive,
            lat,
            lon,
            zoom,
            encoding,
            json,
        } => commands::query::run(archive, cli.leaf_cache_size, lat, lon, zoom, encoding, json),
        Commands::Generate {
            archive,
            output_dir,
            zoom,
            encoding,
            samples,
            strategy,
            format,
            bbox,
            keep_sea_level,
        } => commands::generate::run(
            archive,
            cli.leaf_cache_size,
            output_dir,
            zoom,
            encoding,
            samples,
            strategy,
            format,
            bbox,
            keep_sea_level,
        ),
    }
}
