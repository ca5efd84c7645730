//! Layered data access - main API for reading layered VDC volumes

use crate::cache::ElevationCache;
use crate::error::{Result, VdcError};
use crate::interpolate::{interpolate_region, ElevLayout, RegionShape};
use crate::mapper::CoordinateMapper;
use crate::metadata::VdcMetadata;
use crate::reader::{BlockReaderFactory, BlockRegionReader};
use crate::region::ValidRegionCalculator;
use crate::types::{BlockCoord, LowHighVals, UserCoord, VoxelCoord};
use crate::ELEVATION_VARIABLE;
use ndarray::Array3;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

/// The variable currently bracketed by open/close
#[derive(Debug)]
struct OpenVariable {
    timestep: usize,
    varname: String,
    reflevel: usize,
    elev_open: bool,
}

/// Main interface for reading layered VDC volumes.
///
/// Data is retrieved in two steps: the block reader reconstructs native
/// values along the horizontal layers of the grid, then (when interpolation
/// is on) the layered representation is resampled onto a uniform vertical
/// grid whose height can vary dynamically. With interpolation on, every
/// min/max region parameter is interpreted in uniform-grid voxel
/// coordinates.
///
/// One variable may be open at a time; the elevation cache and the
/// per-variable low/high table persist across open/close brackets. The
/// instance is not safe for concurrent use; callers on multiple threads
/// must serialize access externally.
pub struct LayeredDataAccess {
    metadata: VdcMetadata,
    var_reader: Box<dyn BlockRegionReader>,
    elev_reader: Box<dyn BlockRegionReader>,
    mapper: CoordinateMapper,
    cache: ElevationCache,
    var_blk_buf: Vec<f32>,
    low_high: HashMap<String, LowHighVals>,
    open_var: Option<OpenVariable>,
    interpolate_on: bool,
    grid_height: usize,
    interp_secs: f64,
}

impl LayeredDataAccess {
    /// Create an access layer over a dataset described by `metadata`.
    ///
    /// Both the variable and the elevation readers are created up front
    /// through `factory`; `nthreads` is forwarded for the codec's internal
    /// decode parallelism. Interpolation starts enabled with the grid
    /// height equal to the native vertical dimension.
    pub fn new(
        metadata: VdcMetadata,
        factory: &dyn BlockReaderFactory,
        nthreads: usize,
    ) -> Result<Self> {
        let var_reader = factory.create_reader(&metadata, nthreads)?;
        let elev_reader = factory.create_reader(&metadata, nthreads)?;
        if var_reader.block_size() != metadata.block_size {
            return Err(VdcError::Config(format!(
                "reader block size {:?} does not match descriptor block size {:?}",
                var_reader.block_size(),
                metadata.block_size
            )));
        }

        let grid_height = metadata.dim[2];
        let mapper = CoordinateMapper::new(&metadata, grid_height, true);
        let low_high = default_low_high(&metadata);

        Ok(Self {
            metadata,
            var_reader,
            elev_reader,
            mapper,
            cache: ElevationCache::new(),
            var_blk_buf: Vec::new(),
            low_high,
            open_var: None,
            interpolate_on: true,
            grid_height,
            interp_secs: 0.0,
        })
    }

    /// Create an access layer from a descriptor file
    pub fn from_file(
        path: impl AsRef<Path>,
        factory: &dyn BlockReaderFactory,
        nthreads: usize,
    ) -> Result<Self> {
        let metadata = VdcMetadata::from_file(path)?;
        Self::new(metadata, factory, nthreads)
    }

    /// The dataset descriptor
    pub fn metadata(&self) -> &VdcMetadata {
        &self.metadata
    }

    /// Whether the (timestep, variable, refinement level) triple is present
    /// on disk
    pub fn variable_exists(&self, timestep: usize, varname: &str, reflevel: usize) -> bool {
        self.var_reader.variable_exists(timestep, varname, reflevel)
    }

    /// Prepare a variable for region reads at `reflevel`.
    ///
    /// When interpolation is on, the elevation variable is opened at the
    /// same level. Errors with `DataUnavailable` if either triple is absent
    /// and `InvalidState` if another variable is still open.
    pub fn open_variable_read(
        &mut self,
        timestep: usize,
        varname: &str,
        reflevel: usize,
    ) -> Result<()> {
        debug!(timestep, varname, reflevel, "open_variable_read");

        if let Some(open) = &self.open_var {
            return Err(VdcError::InvalidState(format!(
                "variable '{}' is already open; close it first",
                open.varname
            )));
        }
        if reflevel >= self.metadata.num_reflevels
            || !self.var_reader.variable_exists(timestep, varname, reflevel)
        {
            return Err(VdcError::DataUnavailable {
                timestep,
                varname: varname.to_string(),
                reflevel,
            });
        }

        self.var_reader
            .open_variable_read(timestep, varname, reflevel)?;

        let mut elev_open = false;
        if self.interpolate_on {
            if let Err(err) = self.open_elevation(timestep, reflevel) {
                if let Err(close_err) = self.var_reader.close_variable() {
                    warn!(%close_err, "failed to release variable reader after open error");
                }
                return Err(err);
            }
            elev_open = true;
        }

        self.open_var = Some(OpenVariable {
            timestep,
            varname: varname.to_string(),
            reflevel,
            elev_open,
        });
        Ok(())
    }

    fn open_elevation(&mut self, timestep: usize, reflevel: usize) -> Result<()> {
        if !self
            .elev_reader
            .variable_exists(timestep, ELEVATION_VARIABLE, reflevel)
        {
            return Err(VdcError::DataUnavailable {
                timestep,
                varname: ELEVATION_VARIABLE.to_string(),
                reflevel,
            });
        }
        self.elev_reader
            .open_variable_read(timestep, ELEVATION_VARIABLE, reflevel)?;

        // Layered data must span the full vertical domain
        let (vmin, vmax) = self.var_reader.valid_region()?;
        if vmin[2] != 0 || vmax[2] != self.metadata.dim[2] - 1 {
            if let Err(close_err) = self.elev_reader.close_variable() {
                warn!(%close_err, "failed to release elevation reader");
            }
            return Err(VdcError::Metadata(
                "layered variable does not span the full vertical domain".to_string(),
            ));
        }
        Ok(())
    }

    /// Release the currently open variable.
    ///
    /// Idempotent; the elevation cache and the low/high table are kept.
    pub fn close_variable(&mut self) -> Result<()> {
        debug!("close_variable");
        if let Some(open) = self.open_var.take() {
            self.var_reader.close_variable()?;
            if open.elev_open {
                self.elev_reader.close_variable()?;
            }
        }
        Ok(())
    }

    /// Read a voxel-aligned sub-region of the open variable.
    ///
    /// Returns a (z, y, x)-indexed array covering `min..=max`. With
    /// interpolation off this is the native data unchanged; with
    /// interpolation on the bounds are uniform-grid voxel coordinates and
    /// the result is vertically resampled.
    pub fn read_region(&mut self, min: VoxelCoord, max: VoxelCoord) -> Result<Array3<f32>> {
        debug!(?min, ?max, "read_region");
        let reflevel = self.open_reflevel()?;

        if !self.is_valid_region(min, max, reflevel) {
            return Err(VdcError::InvalidRegion(format!(
                "{:?}..{:?} at refinement level {}",
                min, max, reflevel
            )));
        }

        let nxo = max[0] - min[0] + 1;
        let nyo = max[1] - min[1] + 1;
        let nzo = max[2] - min[2] + 1;

        if !self.interpolate_on {
            let mut buf = Vec::new();
            self.var_reader.read_region(min, max, &mut buf)?;
            return shaped(buf, [nxo, nyo, nzo]);
        }

        // Serve from the block path, then carve out the requested sub-box
        let bs = self.metadata.block_size;
        let bmin = [min[0] / bs[0], min[1] / bs[1], min[2] / bs[2]];
        let bmax = [max[0] / bs[0], max[1] / bs[1], max[2] / bs[2]];
        let (blk, bdims) = self.interpolated_block_read(bmin, bmax)?;

        let off = [
            min[0] - bmin[0] * bs[0],
            min[1] - bmin[1] * bs[1],
            min[2] - bmin[2] * bs[2],
        ];
        let mut out = Vec::with_capacity(nxo * nyo * nzo);
        for z in 0..nzo {
            for y in 0..nyo {
                let row = ((z + off[2]) * bdims[1] + y + off[1]) * bdims[0] + off[0];
                out.extend_from_slice(&blk[row..row + nxo]);
            }
        }
        shaped(out, [nxo, nyo, nzo])
    }

    /// Read a block-aligned sub-region of the open variable.
    ///
    /// With interpolation off the read is delegated to the block reader;
    /// `unblock` selects voxel-contiguous or block-ordered layout (in the
    /// latter case the returned array's axes reflect storage order, not
    /// space). With interpolation on, bounds are uniform-grid block
    /// coordinates, the result is always unblocked, and passing
    /// `unblock = false` is a configuration error.
    pub fn block_read_region(
        &mut self,
        bmin: BlockCoord,
        bmax: BlockCoord,
        unblock: bool,
    ) -> Result<Array3<f32>> {
        debug!(?bmin, ?bmax, unblock, "block_read_region");
        let reflevel = self.open_reflevel()?;

        if !self.is_valid_region_blk(bmin, bmax, reflevel) {
            return Err(VdcError::InvalidRegion(format!(
                "block range {:?}..{:?} at refinement level {}",
                bmin, bmax, reflevel
            )));
        }

        let bs = self.metadata.block_size;
        let dims = [
            (bmax[0] - bmin[0] + 1) * bs[0],
            (bmax[1] - bmin[1] + 1) * bs[1],
            (bmax[2] - bmin[2] + 1) * bs[2],
        ];

        if !self.interpolate_on {
            let mut buf = Vec::new();
            self.var_reader
                .block_read_region(bmin, bmax, unblock, &mut buf)?;
            return shaped(buf, dims);
        }

        if !unblock {
            return Err(VdcError::Config(
                "interpolated block reads always unblock".to_string(),
            ));
        }

        let (data, dims) = self.interpolated_block_read(bmin, bmax)?;
        shaped(data, dims)
    }

    /// Fill the elevation cache as needed, read the native variable blocks
    /// at full vertical extent, and resample onto the uniform grid
    fn interpolated_block_read(
        &mut self,
        bmin: BlockCoord,
        bmax: BlockCoord,
    ) -> Result<(Vec<f32>, [usize; 3])> {
        let (timestep, varname, reflevel) = {
            let open = self
                .open_var
                .as_ref()
                .ok_or_else(|| VdcError::InvalidState("no variable open".to_string()))?;
            (open.timestep, open.varname.clone(), open.reflevel)
        };

        let bs = self.metadata.block_size;
        let native_bdim = self.metadata.bdim_at_level(reflevel);
        let native_dim = self.metadata.dim_at_level(reflevel);

        // Native bounds with full vertical extent; the whole column is read
        // whether needed or not
        let fz_min = [bmin[0], bmin[1], 0];
        let fz_max = [bmax[0], bmax[1], native_bdim[2] - 1];
        let native_nz = native_bdim[2] * bs[2];
        let nx = (bmax[0] - bmin[0] + 1) * bs[0];
        let ny = (bmax[1] - bmin[1] + 1) * bs[1];

        if !self.cache.check(timestep, reflevel, fz_min, fz_max) {
            debug!(?fz_min, ?fz_max, "elevation cache miss");
            self.cache.clear();
            let nvox = nx * ny * native_nz;
            let buf = self.cache.buffer_mut(nvox);
            self.elev_reader.block_read_region(fz_min, fz_max, true, buf)?;
            self.cache.set(timestep, reflevel, fz_min, fz_max);
        }

        self.var_reader
            .block_read_region(fz_min, fz_max, true, &mut self.var_blk_buf)?;

        // User-space height of every output level; the z mapping is affine
        // and shared by all columns
        let out_z0 = bmin[2] * bs[2];
        let out_nz = (bmax[2] - bmin[2] + 1) * bs[2];
        let z_heights: Vec<f64> = (0..out_nz)
            .map(|i| self.mapper.vox_to_user_axis(2, out_z0 + i, reflevel))
            .collect();

        let lh = self.low_high.get(&varname).copied().unwrap_or_default();

        let (_, _, cmin, cmax) = self.cache.entry().ok_or_else(|| {
            VdcError::InvalidState("elevation cache empty after fill".to_string())
        })?;
        let layout = ElevLayout {
            nx: (cmax[0] - cmin[0] + 1) * bs[0],
            ny: (cmax[1] - cmin[1] + 1) * bs[1],
            x0: (bmin[0] - cmin[0]) * bs[0],
            y0: (bmin[1] - cmin[1]) * bs[1],
        };
        let shape = RegionShape {
            nx,
            ny,
            native_nz,
            native_top: native_dim[2] - 1,
            out_nz,
        };

        let mut out = vec![0.0f32; nx * ny * out_nz];
        let start = Instant::now();
        interpolate_region(
            &shape,
            self.cache.data(),
            &layout,
            &self.var_blk_buf,
            &z_heights,
            lh.low,
            lh.high,
            &mut out,
        );
        self.interp_secs += start.elapsed().as_secs_f64();

        Ok((out, [nx, ny, out_nz]))
    }

    /// Toggle between native passthrough and interpolated mode.
    ///
    /// Changes the vertical coordinate semantics of every region parameter,
    /// so set it before `open_variable_read` for the new mode to apply
    /// consistently.
    pub fn set_interpolate_on_off(&mut self, on: bool) {
        self.interpolate_on = on;
        self.mapper.set_interpolate_on(on);
    }

    pub fn interpolate_on(&self) -> bool {
        self.interpolate_on
    }

    /// Set the vertical dimension of the uniform interpolation grid at the
    /// finest refinement level
    pub fn set_grid_height(&mut self, grid_height: usize) -> Result<()> {
        if grid_height == 0 {
            return Err(VdcError::Config(
                "interpolation grid height must be non-zero".to_string(),
            ));
        }
        self.grid_height = grid_height;
        self.mapper.set_grid_height(grid_height);
        Ok(())
    }

    pub fn grid_height(&self) -> usize {
        self.grid_height
    }

    /// Replace the extrapolation constants for the named variables.
    ///
    /// Variables not named fall back to the defaults.
    pub fn set_low_high_vals(
        &mut self,
        var_names: &[String],
        low_vals: &[f32],
        high_vals: &[f32],
    ) -> Result<()> {
        if var_names.len() != low_vals.len() || var_names.len() != high_vals.len() {
            return Err(VdcError::Config(
                "one low and one high value per variable name required".to_string(),
            ));
        }
        self.low_high = default_low_high(&self.metadata);
        for ((name, &low), &high) in var_names.iter().zip(low_vals).zip(high_vals) {
            self.low_high.insert(name.clone(), LowHighVals::new(low, high));
        }
        Ok(())
    }

    /// The extrapolation constants in effect for one variable
    pub fn low_high_vals(&self, varname: &str) -> LowHighVals {
        self.low_high.get(varname).copied().unwrap_or_default()
    }

    /// Invalidate the elevation cache slot
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Accumulated wall-clock seconds spent resampling
    pub fn interpolation_secs(&self) -> f64 {
        self.interp_secs
    }

    /// Volume dimensions in voxels at a refinement level, under the current
    /// interpolation settings
    pub fn get_dim(&self, reflevel: usize) -> VoxelCoord {
        self.mapper.dim_at_level(reflevel)
    }

    /// Volume dimensions in blocks at a refinement level, under the current
    /// interpolation settings
    pub fn get_dim_blk(&self, reflevel: usize) -> BlockCoord {
        let dim = self.get_dim(reflevel);
        let bs = self.metadata.block_size;
        [
            dim[0].div_ceil(bs[0]),
            dim[1].div_ceil(bs[1]),
            dim[2].div_ceil(bs[2]),
        ]
    }

    /// Voxel bounds at `reflevel` actually backed by stored data for the
    /// open variable
    pub fn get_valid_region(&self, reflevel: usize) -> Result<(VoxelCoord, VoxelCoord)> {
        Ok(self.region_calc()?.valid_region(reflevel))
    }

    /// Whether a voxel sub-box is a subset of the valid region
    pub fn is_valid_region(&self, min: VoxelCoord, max: VoxelCoord, reflevel: usize) -> bool {
        self.region_calc()
            .map(|calc| calc.is_valid_region(min, max, reflevel))
            .unwrap_or(false)
    }

    /// Whether a block sub-box is a subset of the valid region
    pub fn is_valid_region_blk(&self, bmin: BlockCoord, bmax: BlockCoord, reflevel: usize) -> bool {
        self.region_calc()
            .map(|calc| calc.is_valid_region_blk(bmin, bmax, reflevel))
            .unwrap_or(false)
    }

    /// Map integer voxel coordinates at `reflevel` to user coordinates
    pub fn map_vox_to_user(&self, vcoord: VoxelCoord, reflevel: usize) -> UserCoord {
        self.mapper.map_vox_to_user(vcoord, reflevel)
    }

    /// Map user coordinates to the closest voxel at `reflevel`
    pub fn map_user_to_vox(&self, ucoord: UserCoord, reflevel: usize) -> VoxelCoord {
        self.mapper.map_user_to_vox(ucoord, reflevel)
    }

    fn open_reflevel(&self) -> Result<usize> {
        self.open_var
            .as_ref()
            .map(|open| open.reflevel)
            .ok_or_else(|| VdcError::InvalidState("no variable open".to_string()))
    }

    fn region_calc(&self) -> Result<ValidRegionCalculator<'_>> {
        if self.open_var.is_none() {
            return Err(VdcError::InvalidState("no variable open".to_string()));
        }
        let native = self.var_reader.valid_region()?;
        Ok(ValidRegionCalculator::new(
            &self.metadata,
            self.grid_height,
            self.interpolate_on,
            native,
        ))
    }
}

fn default_low_high(metadata: &VdcMetadata) -> HashMap<String, LowHighVals> {
    metadata
        .variable_names
        .iter()
        .map(|name| (name.clone(), LowHighVals::default()))
        .collect()
}

/// Shape a flat x-fastest buffer as a (z, y, x)-indexed array
fn shaped(data: Vec<f32>, dims: [usize; 3]) -> Result<Array3<f32>> {
    Array3::from_shape_vec((dims[2], dims[1], dims[0]), data)
        .map_err(|err| VdcError::Metadata(format!("reader returned malformed buffer: {}", err)))
}
