use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pmdem::projection::{lat_to_tile_y, lon_to_tile_x};
use pmdem::{Cell, Resampler, RgbRaster, SamplingStrategy, TileRasterCache};

const ZOOM: u8 = 12;
const TILE_WIDTH: u32 = 256;

/// Synthetic terrarium tile with a gradient that varies per tile.
fn create_tile(tx: u32, ty: u32) -> RgbRaster {
    let mut raster = RgbRaster::filled(TILE_WIDTH, TILE_WIDTH, [128, 0, 0]);
    for y in 0..TILE_WIDTH as usize {
        for x in 0..TILE_WIDTH as usize {
            let r = 128 + ((tx as usize + ty as usize + x / 64) % 16) as u8;
            raster.set_rgb(x, y, [r, (y % 256) as u8, (x % 256) as u8]);
        }
    }
    raster
}

/// Cache holding every tile `cell` touches, without going through an archive.
fn populated_cache(cell: Cell) -> TileRasterCache {
    let x0 = lon_to_tile_x(f64::from(cell.lon), ZOOM).floor() as u32;
    let x1 = lon_to_tile_x(f64::from(cell.lon + 1), ZOOM).floor() as u32;
    let y0 = lat_to_tile_y(f64::from(cell.lat + 1), ZOOM).floor() as u32;
    let y1 = lat_to_tile_y(f64::from(cell.lat), ZOOM).floor() as u32;

    let mut cache = TileRasterCache::new();
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            cache.insert_raster(tx, ty, create_tile(tx, ty)).unwrap();
        }
    }
    cache
}

fn bench_strategies(c: &mut Criterion) {
    let cell = Cell::new(46, 7);
    let cache = populated_cache(cell);

    let mut group = c.benchmark_group("sample_cell");
    group.sample_size(10);

    for samples in [1201usize, 3601] {
        for strategy in [SamplingStrategy::Scalar, SamplingStrategy::Batched] {
            let resampler = Resampler::builder()
                .zoom(ZOOM)
                .samples(samples)
                .strategy(strategy)
                .build()
                .unwrap();

            group.bench_with_input(
                BenchmarkId::new(strategy.name(), samples),
                &resampler,
                |b, resampler| {
                    b.iter(|| black_box(resampler.sample(black_box(cell), &cache).unwrap()));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
