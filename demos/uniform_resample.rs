//! Resample a synthetic layered atmosphere onto a uniform vertical grid.
//!
//! Builds a terrain-following temperature field over a Gaussian ridge,
//! then reads it back on a uniform 40-level grid with below-terrain
//! voxels filled with NaN.
//!
//! Run with: cargo run --example uniform_resample

use anyhow::Result;
use layered_vdc::testdata::{fill_volume, MemDataset, MemReaderFactory};
use layered_vdc::{Extents, GridType, LayeredDataAccess, VdcMetadata, ELEVATION_VARIABLE};
use std::rc::Rc;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 64x64 columns, 20 native layers following a ridge along y
    let md = VdcMetadata::new(
        GridType::Layered,
        [64, 64, 20],
        [16, 16, 4],
        1,
        Extents::new([0.0, 0.0, 0.0], [63.0, 63.0, 5000.0]),
    )?
    .with_variable_names(vec!["T", ELEVATION_VARIABLE]);

    let terrain = |x: usize, y: usize| -> f32 {
        let dx = x as f32 - 32.0;
        1200.0 * (-dx * dx / 400.0).exp() + 3.0 * y as f32
    };

    let mut ds = MemDataset::new(md.clone());
    ds.insert_volume(
        0,
        ELEVATION_VARIABLE,
        0,
        fill_volume([64, 64, 20], |x, y, k| {
            let floor = terrain(x, y);
            floor + (5000.0 - floor) * k as f32 / 19.0
        }),
    )?;
    ds.insert_volume(
        0,
        "T",
        0,
        fill_volume([64, 64, 20], |_, _, k| 288.0 - 0.5 * k as f32),
    )?;

    let factory = MemReaderFactory::new(Rc::new(ds));
    let mut vdc = LayeredDataAccess::new(md, &factory, 1)?;
    vdc.set_grid_height(40)?;
    vdc.set_low_high_vals(&["T".to_string()], &[f32::NAN], &[216.5])?;

    vdc.open_variable_read(0, "T", 0)?;
    let region = vdc.read_region([0, 0, 0], [63, 63, 39])?;
    vdc.close_variable()?;

    let below = region.iter().filter(|v| v.is_nan()).count();
    let (nz, ny, nx) = region.dim();
    println!("resampled {}x{}x{} voxels onto the uniform grid", nx, ny, nz);
    println!(
        "{} voxels below terrain ({:.1}%)",
        below,
        100.0 * below as f64 / region.len() as f64
    );
    println!("interpolation time: {:.4}s", vdc.interpolation_secs());

    // A second read of the same region reuses the cached elevation blocks
    vdc.open_variable_read(0, "T", 0)?;
    let again = vdc.read_region([0, 0, 0], [63, 63, 39])?;
    vdc.close_variable()?;
    assert_eq!(region.dim(), again.dim());
    println!("second read served from the elevation cache");

    Ok(())
}
