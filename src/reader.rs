//! Block-region reader capability
//!
//! The wavelet codec that actually decodes compressed blocks is an external
//! collaborator. This module defines the capability it must expose; the
//! access layer composes over it and never derives from it. Implementations
//! hold the open-variable state themselves: `open_variable_read` brackets a
//! read burst, and the region read methods operate on the currently open
//! variable.

use crate::error::Result;
use crate::metadata::VdcMetadata;
use crate::types::{BlockCoord, VoxelCoord};

/// Read-only access to one variable of a block-compressed multiresolution
/// store.
///
/// All coordinates are native (non-interpolated) and relative to the
/// refinement level the variable was opened at, except where noted. Region
/// bounds are inclusive on both ends. Readers fill caller-owned buffers so
/// capacity can be reused across calls; a filled buffer is resized to exactly
/// the region's voxel count.
pub trait BlockRegionReader {
    /// Whether the (timestep, variable, refinement level) triple is present
    /// on disk
    fn variable_exists(&self, timestep: usize, varname: &str, reflevel: usize) -> bool;

    /// Prepare the named variable for region reads at `reflevel`
    fn open_variable_read(&mut self, timestep: usize, varname: &str, reflevel: usize)
        -> Result<()>;

    /// Release the currently open variable
    fn close_variable(&mut self) -> Result<()>;

    /// Read a voxel-aligned sub-region of the open variable into `dst`
    fn read_region(&mut self, min: VoxelCoord, max: VoxelCoord, dst: &mut Vec<f32>) -> Result<()>;

    /// Read a block-aligned sub-region of the open variable into `dst`
    ///
    /// With `unblock` set, the result is a voxel-contiguous (x-fastest)
    /// array covering the block-aligned bounds; otherwise blocks are laid
    /// out one after another in block-index order. Voxels padding a partial
    /// boundary block carry unspecified values.
    fn block_read_region(
        &mut self,
        bmin: BlockCoord,
        bmax: BlockCoord,
        unblock: bool,
        dst: &mut Vec<f32>,
    ) -> Result<()>;

    /// Block dimensions in voxels, fixed per dataset
    fn block_size(&self) -> VoxelCoord;

    /// Native volume dimensions in voxels at a refinement level
    fn dim_at_level(&self, reflevel: usize) -> VoxelCoord;

    /// Bounds of the stored data for the open variable, in voxel coordinates
    /// at the finest refinement level
    ///
    /// Layered collections may store a horizontal subset of the full domain;
    /// the returned box is what is actually backed by data on disk. Errors
    /// with `InvalidState` if no variable is open.
    fn valid_region(&self) -> Result<(VoxelCoord, VoxelCoord)>;
}

/// Creates [`BlockRegionReader`] instances for a dataset.
///
/// Injected into the access layer at construction; the `nthreads` hint is
/// forwarded for the codec's internal decode parallelism and implies nothing
/// about the thread safety of the produced reader.
pub trait BlockReaderFactory {
    fn create_reader(
        &self,
        metadata: &VdcMetadata,
        nthreads: usize,
    ) -> Result<Box<dyn BlockRegionReader>>;
}
