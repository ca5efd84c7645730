//! Benchmark of the interpolated block-read path, elevation cache warm.

use criterion::{criterion_group, criterion_main, Criterion};
use layered_vdc::testdata::{fill_volume, MemDataset, MemReaderFactory};
use layered_vdc::{Extents, GridType, LayeredDataAccess, VdcMetadata, ELEVATION_VARIABLE};
use std::hint::black_box;
use std::rc::Rc;

fn bench_interpolated_read(c: &mut Criterion) {
    let md = VdcMetadata::new(
        GridType::Layered,
        [64, 64, 32],
        [16, 16, 8],
        1,
        Extents::new([0.0, 0.0, 0.0], [63.0, 63.0, 1000.0]),
    )
    .unwrap()
    .with_variable_names(vec!["T", ELEVATION_VARIABLE]);

    let mut ds = MemDataset::new(md.clone());
    ds.insert_volume(
        0,
        ELEVATION_VARIABLE,
        0,
        fill_volume([64, 64, 32], |x, y, k| {
            let floor = (x as f32).sin() * 40.0 + (y as f32) * 0.5 + 50.0;
            floor + (1000.0 - floor) * k as f32 / 31.0
        }),
    )
    .unwrap();
    ds.insert_volume(
        0,
        "T",
        0,
        fill_volume([64, 64, 32], |_, _, k| 300.0 - k as f32),
    )
    .unwrap();

    let factory = MemReaderFactory::new(Rc::new(ds));
    let mut vdc = LayeredDataAccess::new(md, &factory, 1).unwrap();
    vdc.set_grid_height(64).unwrap();
    vdc.open_variable_read(0, "T", 0).unwrap();

    c.bench_function("interpolated_block_read_64x64x64", |b| {
        b.iter(|| {
            let region = vdc
                .block_read_region([0, 0, 0], [3, 3, 7], true)
                .unwrap();
            black_box(region);
        })
    });
}

criterion_group!(benches, bench_interpolated_read);
criterion_main!(benches);
