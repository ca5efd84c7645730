//! Column-wise vertical resampling of layered data
//!
//! Native layered data carries one elevation sample per voxel; along each
//! horizontal column the elevation samples ascend from the terrain floor to
//! the domain top. Resampling walks each column once with a monotone cursor:
//! uniform levels below the floor take the variable's low value, levels above
//! the native top take the high value, and interior levels interpolate
//! linearly between the two bracketing native samples. Heights that land
//! exactly on a native sample reproduce that sample bit-for-bit, and a
//! zero-thickness bracket yields the lower sample unmixed.

/// Voxel dimensions of the buffers involved in one resampling pass
#[derive(Debug, Clone, Copy)]
pub(crate) struct RegionShape {
    /// Horizontal voxel dimensions shared by the output and variable buffers
    pub nx: usize,
    pub ny: usize,
    /// Vertical voxel extent of the native (block padded) buffers
    pub native_nz: usize,
    /// Index of the last valid native vertical sample
    pub native_top: usize,
    /// Vertical voxel extent of the output buffer
    pub out_nz: usize,
}

/// Placement of the requested region inside the (possibly larger) cached
/// elevation buffer
#[derive(Debug, Clone, Copy)]
pub(crate) struct ElevLayout {
    pub nx: usize,
    pub ny: usize,
    /// Voxel offset of the region's first column within the elevation buffer
    pub x0: usize,
    pub y0: usize,
}

/// Resample one layered region onto the uniform vertical grid.
///
/// `z_heights` holds the user-space height of each output level; the z→user
/// mapping is affine and column-independent, so it is computed once by the
/// caller rather than per voxel. `elev` and `var` span the full native
/// vertical extent.
pub(crate) fn interpolate_region(
    shape: &RegionShape,
    elev: &[f32],
    elev_layout: &ElevLayout,
    var: &[f32],
    z_heights: &[f64],
    low_val: f32,
    high_val: f32,
    out: &mut [f32],
) {
    let RegionShape {
        nx,
        ny,
        native_nz,
        native_top,
        out_nz,
    } = *shape;

    debug_assert!(native_top < native_nz);
    debug_assert_eq!(z_heights.len(), out_nz);
    debug_assert_eq!(var.len(), nx * ny * native_nz);
    debug_assert_eq!(out.len(), nx * ny * out_nz);
    debug_assert!(elev_layout.x0 + nx <= elev_layout.nx);
    debug_assert!(elev_layout.y0 + ny <= elev_layout.ny);

    let e_nx = elev_layout.nx;
    let e_ny = elev_layout.ny;

    for y in 0..ny {
        for x in 0..nx {
            let e_base = (elev_layout.y0 + y) * e_nx + elev_layout.x0 + x;
            let e_at = |z: usize| elev[z * e_nx * e_ny + e_base] as f64;
            let v_at = |z: usize| var[(z * ny + y) * nx + x];

            let floor = e_at(0);
            let top = e_at(native_top);

            // Bracketing layer; only ever ascends within a column
            let mut z = 0usize;

            for (zi, &height) in z_heights.iter().enumerate() {
                let value = if height < floor {
                    low_val
                } else if height > top {
                    high_val
                } else if native_top == 0 {
                    // Single-layer column, height coincides with it
                    v_at(0)
                } else {
                    while z + 1 < native_top && e_at(z + 1) < height {
                        z += 1;
                    }
                    let lower = e_at(z);
                    let upper = e_at(z + 1);
                    if upper <= lower {
                        v_at(z)
                    } else {
                        let frac = (height - lower) / (upper - lower);
                        ((1.0 - frac) * v_at(z) as f64 + frac * v_at(z + 1) as f64) as f32
                    }
                };

                out[(zi * ny + y) * nx + x] = value;
            }
        }
    }
}
