//! Walk the refinement hierarchy of a dataset where the finest level was
//! never written, degrading gracefully to the finest level present.
//!
//! Run with: cargo run --example refinement_walk

use anyhow::Result;
use layered_vdc::testdata::{fill_volume, MemDataset, MemReaderFactory};
use layered_vdc::{Extents, GridType, LayeredDataAccess, VdcMetadata, ELEVATION_VARIABLE};
use std::rc::Rc;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let md = VdcMetadata::new(
        GridType::Layered,
        [32, 32, 16],
        [8, 8, 4],
        3,
        Extents::new([0.0, 0.0, 0.0], [31.0, 31.0, 100.0]),
    )?
    .with_variable_names(vec!["W", ELEVATION_VARIABLE]);

    // Levels 0 and 1 are stored; the finest level is missing on disk
    let mut ds = MemDataset::new(md.clone());
    for reflevel in 0..2 {
        let dim = md.dim_at_level(reflevel);
        ds.insert_volume(
            0,
            ELEVATION_VARIABLE,
            reflevel,
            fill_volume(dim, |_, _, k| 100.0 * k as f32 / (dim[2] - 1) as f32),
        )?;
        ds.insert_volume(
            0,
            "W",
            reflevel,
            fill_volume(dim, |x, y, k| (x + y) as f32 * 0.1 + k as f32),
        )?;
    }

    let factory = MemReaderFactory::new(Rc::new(ds));
    let mut vdc = LayeredDataAccess::new(md, &factory, 1)?;
    vdc.set_grid_height(32)?;

    for reflevel in 0..3 {
        println!(
            "level {}: {:?} voxels, {:?} blocks, stored = {}",
            reflevel,
            vdc.get_dim(reflevel),
            vdc.get_dim_blk(reflevel),
            vdc.variable_exists(0, "W", reflevel),
        );
    }

    // No automatic retry: the caller walks down until a level is present
    let mut reflevel = vdc.metadata().max_refinement();
    while reflevel > 0 && !vdc.variable_exists(0, "W", reflevel) {
        reflevel -= 1;
    }
    println!("reading at refinement level {}", reflevel);

    vdc.open_variable_read(0, "W", reflevel)?;
    let (min, max) = vdc.get_valid_region(reflevel)?;
    let region = vdc.read_region(min, max)?;
    vdc.close_variable()?;

    let (nz, ny, nx) = region.dim();
    println!("read {}x{}x{} voxels from {:?}..{:?}", nx, ny, nz, min, max);
    Ok(())
}
