//! Resolution- and height-dependent valid-region bounds
//!
//! Layered collections may store data for a horizontal subset of the full
//! domain. Once a column has any terrain data, low/high extrapolation makes
//! its entire vertical range answerable, so validity is a horizontal-coverage
//! question: the vertical extent of the valid box is always the full z range
//! at the requested level. All bounds are inclusive on both ends, in voxel
//! and block coordinates alike.

use crate::metadata::{scale_dim, VdcMetadata};
use crate::types::{BlockCoord, VoxelCoord};

/// Computes valid-region bounds for the currently open variable
#[derive(Debug)]
pub struct ValidRegionCalculator<'a> {
    metadata: &'a VdcMetadata,
    grid_height: usize,
    interpolate_on: bool,
    /// Stored-data bounds at the finest refinement level
    native_valid: (VoxelCoord, VoxelCoord),
}

impl<'a> ValidRegionCalculator<'a> {
    pub fn new(
        metadata: &'a VdcMetadata,
        grid_height: usize,
        interpolate_on: bool,
        native_valid: (VoxelCoord, VoxelCoord),
    ) -> Self {
        Self {
            metadata,
            grid_height,
            interpolate_on,
            native_valid,
        }
    }

    fn dim_at_level(&self, reflevel: usize) -> VoxelCoord {
        let mut dim = self.metadata.dim_at_level(reflevel);
        if self.interpolate_on {
            dim[2] = scale_dim(self.grid_height, self.metadata.ldelta(reflevel));
        }
        dim
    }

    /// Voxel bounds, relative to `reflevel`, actually backed by stored data
    pub fn valid_region(&self, reflevel: usize) -> (VoxelCoord, VoxelCoord) {
        let ld = self.metadata.ldelta(reflevel);
        let dim = self.dim_at_level(reflevel);
        let (nmin, nmax) = self.native_valid;

        let mut min = [0usize; 3];
        let mut max = [0usize; 3];
        for i in 0..2 {
            min[i] = nmin[i] >> ld;
            max[i] = (nmax[i] >> ld).min(dim[i] - 1);
        }

        if self.interpolate_on {
            // Extrapolation covers the whole interpolated column
            min[2] = 0;
            max[2] = dim[2] - 1;
        } else {
            min[2] = nmin[2] >> ld;
            max[2] = (nmax[2] >> ld).min(dim[2] - 1);
        }

        (min, max)
    }

    /// Whether a queried sub-box is a subset of the valid region
    pub fn is_valid_region(&self, min: VoxelCoord, max: VoxelCoord, reflevel: usize) -> bool {
        let (vmin, vmax) = self.valid_region(reflevel);
        (0..3).all(|i| min[i] <= max[i] && min[i] >= vmin[i] && max[i] <= vmax[i])
    }

    /// Whether a queried sub-box, in block coordinates, is a subset of the
    /// valid region
    pub fn is_valid_region_blk(&self, bmin: BlockCoord, bmax: BlockCoord, reflevel: usize) -> bool {
        let (vmin, vmax) = self.valid_region(reflevel);
        let bs = self.metadata.block_size;
        (0..3).all(|i| {
            bmin[i] <= bmax[i] && bmin[i] >= vmin[i] / bs[i] && bmax[i] <= vmax[i] / bs[i]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Extents, GridType};

    fn test_metadata() -> VdcMetadata {
        VdcMetadata::new(
            GridType::Layered,
            [64, 48, 20],
            [16, 16, 4],
            3,
            Extents::new([0.0, 0.0, 0.0], [630.0, 470.0, 1900.0]),
        )
        .unwrap()
    }

    fn full_native(md: &VdcMetadata) -> (VoxelCoord, VoxelCoord) {
        ([0, 0, 0], [md.dim[0] - 1, md.dim[1] - 1, md.dim[2] - 1])
    }

    #[test]
    fn test_full_domain_valid_region() {
        let md = test_metadata();
        let calc = ValidRegionCalculator::new(&md, 40, true, full_native(&md));
        assert_eq!(calc.valid_region(2), ([0, 0, 0], [63, 47, 39]));
        assert_eq!(calc.valid_region(0), ([0, 0, 0], [15, 11, 9]));
    }

    #[test]
    fn test_valid_region_is_sub_box_of_domain() {
        let md = test_metadata();
        let calc = ValidRegionCalculator::new(&md, 40, true, ([8, 8, 0], [55, 39, 19]));
        for reflevel in 0..3 {
            let dim = calc.dim_at_level(reflevel);
            let (min, max) = calc.valid_region(reflevel);
            for i in 0..3 {
                assert!(min[i] <= max[i]);
                assert!(max[i] < dim[i]);
            }
        }
    }

    #[test]
    fn test_horizontal_coverage_non_decreasing_when_coarsening() {
        let md = test_metadata();
        let calc = ValidRegionCalculator::new(&md, 40, true, ([9, 8, 0], [54, 39, 19]));
        for i in 0..2 {
            for reflevel in (1..3).rev() {
                let fine = calc.valid_region(reflevel);
                let coarse = calc.valid_region(reflevel - 1);
                let fine_dim = calc.dim_at_level(reflevel)[i];
                let coarse_dim = calc.dim_at_level(reflevel - 1)[i];
                let fine_extent = fine.1[i] - fine.0[i] + 1;
                let coarse_extent = coarse.1[i] - coarse.0[i] + 1;
                // Coverage fraction never narrows at a coarser level
                assert!(coarse_extent * fine_dim >= fine_extent * coarse_dim);
            }
        }
    }

    #[test]
    fn test_interpolated_vertical_extent_is_full_column() {
        let md = test_metadata();
        // Horizontal subset, but the vertical range is whole
        let calc = ValidRegionCalculator::new(&md, 40, true, ([16, 16, 0], [47, 31, 19]));
        let (min, max) = calc.valid_region(2);
        assert_eq!((min[2], max[2]), (0, 39));
        assert_eq!((min[0], max[0]), (16, 47));
    }

    #[test]
    fn test_native_vertical_extent_from_stored_bounds() {
        let md = test_metadata();
        let calc = ValidRegionCalculator::new(&md, 40, false, full_native(&md));
        let (min, max) = calc.valid_region(2);
        assert_eq!((min[2], max[2]), (0, 19));
    }

    #[test]
    fn test_is_valid_region_inclusive_bounds() {
        let md = test_metadata();
        let calc = ValidRegionCalculator::new(&md, 40, true, full_native(&md));
        assert!(calc.is_valid_region([0, 0, 0], [63, 47, 39], 2));
        assert!(!calc.is_valid_region([0, 0, 0], [64, 47, 39], 2));
        // Inverted boxes are never valid
        assert!(!calc.is_valid_region([5, 0, 0], [4, 47, 39], 2));
    }

    #[test]
    fn test_is_valid_region_blk_matches_voxel_convention() {
        let md = test_metadata();
        let calc = ValidRegionCalculator::new(&md, 40, true, full_native(&md));
        assert!(calc.is_valid_region_blk([0, 0, 0], [3, 2, 9], 2));
        assert!(!calc.is_valid_region_blk([0, 0, 0], [4, 2, 9], 2));

        // A horizontal subset narrows the block box too
        let calc = ValidRegionCalculator::new(&md, 40, true, ([16, 16, 0], [47, 31, 19]));
        assert!(calc.is_valid_region_blk([1, 1, 0], [2, 1, 9], 2));
        assert!(!calc.is_valid_region_blk([0, 1, 0], [2, 1, 9], 2));
    }
}
