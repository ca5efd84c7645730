//! Voxel/user coordinate conversion
//!
//! Voxel coordinates at a refinement level map affinely onto the
//! user-defined coordinate system: each forward transform halves the sample
//! count, doubling the step and pulling the first sample half a (finer) step
//! in from the boundary. With interpolation on, the vertical axis is the
//! uniform interpolation grid rather than the native layer count, so the
//! same physical elevation range can present different z-extents depending
//! on the interpolation settings.

use crate::metadata::{scale_dim, VdcMetadata};
use crate::types::{Extents, UserCoord, VoxelCoord};

/// Affine voxel/user mapping for one dataset
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    extents: Extents,
    dim: VoxelCoord,
    num_reflevels: usize,
    grid_height: usize,
    interpolate_on: bool,
}

impl CoordinateMapper {
    pub fn new(metadata: &VdcMetadata, grid_height: usize, interpolate_on: bool) -> Self {
        Self {
            extents: metadata.extents,
            dim: metadata.dim,
            num_reflevels: metadata.num_reflevels,
            grid_height,
            interpolate_on,
        }
    }

    pub fn set_grid_height(&mut self, grid_height: usize) {
        self.grid_height = grid_height;
    }

    pub fn set_interpolate_on(&mut self, on: bool) {
        self.interpolate_on = on;
    }

    fn ldelta(&self, reflevel: usize) -> usize {
        self.num_reflevels - 1 - reflevel.min(self.num_reflevels - 1)
    }

    /// Finest-level sample count along one axis under the current
    /// interpolation settings
    fn finest_dim(&self, axis: usize) -> usize {
        if axis == 2 && self.interpolate_on {
            self.grid_height
        } else {
            self.dim[axis]
        }
    }

    /// Volume dimensions at a refinement level under the current
    /// interpolation settings
    pub fn dim_at_level(&self, reflevel: usize) -> VoxelCoord {
        let ld = self.ldelta(reflevel);
        [
            scale_dim(self.finest_dim(0), ld),
            scale_dim(self.finest_dim(1), ld),
            scale_dim(self.finest_dim(2), ld),
        ]
    }

    /// User coordinate of a voxel index along one axis
    pub fn vox_to_user_axis(&self, axis: usize, vox: usize, reflevel: usize) -> f64 {
        let n = self.finest_dim(axis);
        if n <= 1 {
            return self.extents.min[axis];
        }

        // Step between finest-level samples; the boundary shrinks and the
        // step doubles with each transform
        let mut delta = self.extents.span(axis) / (n - 1) as f64;
        let mut x0 = self.extents.min[axis];
        for _ in 0..self.ldelta(reflevel) {
            x0 += 0.5 * delta;
            delta *= 2.0;
        }

        x0 + vox as f64 * delta
    }

    /// Map integer voxel coordinates at `reflevel` to user coordinates
    pub fn map_vox_to_user(&self, vcoord: VoxelCoord, reflevel: usize) -> UserCoord {
        [
            self.vox_to_user_axis(0, vcoord[0], reflevel),
            self.vox_to_user_axis(1, vcoord[1], reflevel),
            self.vox_to_user_axis(2, vcoord[2], reflevel),
        ]
    }

    /// Map user coordinates to the closest voxel at `reflevel`, clamped to
    /// the domain
    pub fn map_user_to_vox(&self, ucoord: UserCoord, reflevel: usize) -> VoxelCoord {
        let dim_l = self.dim_at_level(reflevel);
        let mut vcoord = [0usize; 3];

        for axis in 0..3 {
            if dim_l[axis] <= 1 {
                continue;
            }
            let n = self.finest_dim(axis);

            let mut delta = self.extents.span(axis) / (n - 1) as f64;
            let mut x0 = self.extents.min[axis];
            for _ in 0..self.ldelta(reflevel) {
                x0 += 0.5 * delta;
                delta *= 2.0;
            }

            let lo = x0;
            let hi = lo + delta * (dim_l[axis] - 1) as f64;
            let a = (ucoord[axis] - lo) / (hi - lo);

            let v = if a < 0.0 {
                0
            } else {
                (a * (dim_l[axis] - 1) as f64).round() as usize
            };
            vcoord[axis] = v.min(dim_l[axis] - 1);
        }

        vcoord
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GridType;

    fn test_mapper(interpolate_on: bool) -> CoordinateMapper {
        let md = VdcMetadata::new(
            GridType::Layered,
            [64, 48, 20],
            [16, 16, 4],
            3,
            Extents::new([0.0, 0.0, 0.0], [630.0, 470.0, 1900.0]),
        )
        .unwrap();
        CoordinateMapper::new(&md, 40, interpolate_on)
    }

    #[test]
    fn test_vox_to_user_endpoints_native() {
        let m = test_mapper(false);
        let lo = m.map_vox_to_user([0, 0, 0], 2);
        let hi = m.map_vox_to_user([63, 47, 19], 2);
        assert_eq!(lo, [0.0, 0.0, 0.0]);
        assert_eq!(hi, [630.0, 470.0, 1900.0]);
    }

    #[test]
    fn test_interpolated_z_axis_uses_grid_height() {
        let m = test_mapper(true);
        assert_eq!(m.dim_at_level(2), [64, 48, 40]);
        // Top interpolated voxel still lands on the domain top
        let hi = m.map_vox_to_user([0, 0, 39], 2);
        assert!((hi[2] - 1900.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_within_one_voxel_every_level() {
        for interp in [false, true] {
            let m = test_mapper(interp);
            for reflevel in 0..3 {
                let dim = m.dim_at_level(reflevel);
                for x in 0..dim[0] {
                    for z in 0..dim[2] {
                        let v = [x, x % dim[1], z];
                        let u = m.map_vox_to_user(v, reflevel);
                        let back = m.map_user_to_vox(u, reflevel);
                        for i in 0..3 {
                            assert!(
                                back[i].abs_diff(v[i]) <= 1,
                                "level {}: {:?} -> {:?} -> {:?}",
                                reflevel,
                                v,
                                u,
                                back
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_user_to_vox_clamps_out_of_domain() {
        let m = test_mapper(false);
        assert_eq!(m.map_user_to_vox([-50.0, -1.0, -10.0], 2), [0, 0, 0]);
        let v = m.map_user_to_vox([1e6, 1e6, 1e6], 2);
        assert_eq!(v, [63, 47, 19]);
    }

    #[test]
    fn test_coarser_levels_step_doubles() {
        let m = test_mapper(false);
        let fine = m.map_vox_to_user([1, 0, 0], 2)[0] - m.map_vox_to_user([0, 0, 0], 2)[0];
        let coarse = m.map_vox_to_user([1, 0, 0], 1)[0] - m.map_vox_to_user([0, 0, 0], 1)[0];
        assert!((coarse - 2.0 * fine).abs() < 1e-9);
    }
}
