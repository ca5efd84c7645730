//! Synthetic in-memory datasets
//!
//! A [`BlockRegionReader`] implementation backed by plain vectors, for tests,
//! demos and benchmarks that need a dataset without a codec on disk. Volumes
//! are inserted per (timestep, variable, refinement level) at that level's
//! native dimensions; block reads count their invocations so caching
//! behavior can be asserted.

use crate::error::{Result, VdcError};
use crate::metadata::VdcMetadata;
use crate::reader::{BlockReaderFactory, BlockRegionReader};
use crate::types::{BlockCoord, VoxelCoord};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

type VolumeKey = (usize, String, usize);

/// In-memory stand-in for a block-compressed collection
pub struct MemDataset {
    metadata: VdcMetadata,
    volumes: HashMap<VolumeKey, Vec<f32>>,
    /// Per-variable stored-data bounds at the finest level; defaults to the
    /// full domain
    valid_bounds: HashMap<String, (VoxelCoord, VoxelCoord)>,
    block_reads: RefCell<HashMap<VolumeKey, usize>>,
}

impl MemDataset {
    pub fn new(metadata: VdcMetadata) -> Self {
        Self {
            metadata,
            volumes: HashMap::new(),
            valid_bounds: HashMap::new(),
            block_reads: RefCell::new(HashMap::new()),
        }
    }

    pub fn metadata(&self) -> &VdcMetadata {
        &self.metadata
    }

    /// Insert a full native volume for one (timestep, variable, level) triple
    pub fn insert_volume(
        &mut self,
        timestep: usize,
        varname: &str,
        reflevel: usize,
        data: Vec<f32>,
    ) -> Result<()> {
        let dim = self.metadata.dim_at_level(reflevel);
        let expect: usize = dim.iter().product();
        if data.len() != expect {
            return Err(VdcError::Metadata(format!(
                "volume '{}' at level {} needs {} voxels, got {}",
                varname,
                reflevel,
                expect,
                data.len()
            )));
        }
        self.volumes
            .insert((timestep, varname.to_string(), reflevel), data);
        Ok(())
    }

    /// Restrict the stored-data bounds reported for one variable
    pub fn set_valid_bounds(&mut self, varname: &str, min: VoxelCoord, max: VoxelCoord) {
        self.valid_bounds.insert(varname.to_string(), (min, max));
    }

    /// Number of block reads served for one triple so far
    pub fn block_reads(&self, timestep: usize, varname: &str, reflevel: usize) -> usize {
        self.block_reads
            .borrow()
            .get(&(timestep, varname.to_string(), reflevel))
            .copied()
            .unwrap_or(0)
    }

    fn volume(&self, key: &VolumeKey) -> Option<&Vec<f32>> {
        self.volumes.get(key)
    }
}

/// Produces readers over a shared [`MemDataset`]
pub struct MemReaderFactory {
    dataset: Rc<MemDataset>,
}

impl MemReaderFactory {
    pub fn new(dataset: Rc<MemDataset>) -> Self {
        Self { dataset }
    }
}

impl BlockReaderFactory for MemReaderFactory {
    fn create_reader(
        &self,
        _metadata: &VdcMetadata,
        _nthreads: usize,
    ) -> Result<Box<dyn BlockRegionReader>> {
        Ok(Box::new(MemBlockReader {
            dataset: Rc::clone(&self.dataset),
            open: None,
        }))
    }
}

/// Reader over one [`MemDataset`]
pub struct MemBlockReader {
    dataset: Rc<MemDataset>,
    open: Option<VolumeKey>,
}

impl MemBlockReader {
    fn open_key(&self) -> Result<&VolumeKey> {
        self.open
            .as_ref()
            .ok_or_else(|| VdcError::InvalidState("no variable open".to_string()))
    }
}

impl BlockRegionReader for MemBlockReader {
    fn variable_exists(&self, timestep: usize, varname: &str, reflevel: usize) -> bool {
        self.dataset
            .volume(&(timestep, varname.to_string(), reflevel))
            .is_some()
    }

    fn open_variable_read(
        &mut self,
        timestep: usize,
        varname: &str,
        reflevel: usize,
    ) -> Result<()> {
        if self.open.is_some() {
            return Err(VdcError::InvalidState(
                "a variable is already open".to_string(),
            ));
        }
        if !self.variable_exists(timestep, varname, reflevel) {
            return Err(VdcError::DataUnavailable {
                timestep,
                varname: varname.to_string(),
                reflevel,
            });
        }
        self.open = Some((timestep, varname.to_string(), reflevel));
        Ok(())
    }

    fn close_variable(&mut self) -> Result<()> {
        self.open = None;
        Ok(())
    }

    fn read_region(&mut self, min: VoxelCoord, max: VoxelCoord, dst: &mut Vec<f32>) -> Result<()> {
        let key = self.open_key()?.clone();
        let reflevel = key.2;
        let dim = self.dataset.metadata.dim_at_level(reflevel);
        for i in 0..3 {
            if min[i] > max[i] || max[i] >= dim[i] {
                return Err(VdcError::InvalidRegion(format!(
                    "{:?}..{:?} outside native volume {:?}",
                    min, max, dim
                )));
            }
        }

        let data = self
            .dataset
            .volume(&key)
            .ok_or_else(|| VdcError::InvalidState("open volume vanished".to_string()))?;

        dst.clear();
        dst.reserve((max[0] - min[0] + 1) * (max[1] - min[1] + 1) * (max[2] - min[2] + 1));
        for z in min[2]..=max[2] {
            for y in min[1]..=max[1] {
                let row = (z * dim[1] + y) * dim[0];
                dst.extend_from_slice(&data[row + min[0]..row + max[0] + 1]);
            }
        }
        Ok(())
    }

    fn block_read_region(
        &mut self,
        bmin: BlockCoord,
        bmax: BlockCoord,
        unblock: bool,
        dst: &mut Vec<f32>,
    ) -> Result<()> {
        let key = self.open_key()?.clone();
        let reflevel = key.2;
        let dim = self.dataset.metadata.dim_at_level(reflevel);
        let bdim = self.dataset.metadata.bdim_at_level(reflevel);
        let bs = self.dataset.metadata.block_size;
        for i in 0..3 {
            if bmin[i] > bmax[i] || bmax[i] >= bdim[i] {
                return Err(VdcError::InvalidRegion(format!(
                    "block range {:?}..{:?} outside native volume {:?} blocks",
                    bmin, bmax, bdim
                )));
            }
        }

        let data = self
            .dataset
            .volume(&key)
            .ok_or_else(|| VdcError::InvalidState("open volume vanished".to_string()))?;

        *self
            .dataset
            .block_reads
            .borrow_mut()
            .entry(key)
            .or_insert(0) += 1;

        let sample = |gx: usize, gy: usize, gz: usize| -> f32 {
            if gx < dim[0] && gy < dim[1] && gz < dim[2] {
                data[(gz * dim[1] + gy) * dim[0] + gx]
            } else {
                0.0
            }
        };

        dst.clear();
        if unblock {
            for z in 0..(bmax[2] - bmin[2] + 1) * bs[2] {
                for y in 0..(bmax[1] - bmin[1] + 1) * bs[1] {
                    for x in 0..(bmax[0] - bmin[0] + 1) * bs[0] {
                        dst.push(sample(
                            bmin[0] * bs[0] + x,
                            bmin[1] * bs[1] + y,
                            bmin[2] * bs[2] + z,
                        ));
                    }
                }
            }
        } else {
            for bz in bmin[2]..=bmax[2] {
                for by in bmin[1]..=bmax[1] {
                    for bx in bmin[0]..=bmax[0] {
                        for z in 0..bs[2] {
                            for y in 0..bs[1] {
                                for x in 0..bs[0] {
                                    dst.push(sample(
                                        bx * bs[0] + x,
                                        by * bs[1] + y,
                                        bz * bs[2] + z,
                                    ));
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn block_size(&self) -> VoxelCoord {
        self.dataset.metadata.block_size
    }

    fn dim_at_level(&self, reflevel: usize) -> VoxelCoord {
        self.dataset.metadata.dim_at_level(reflevel)
    }

    fn valid_region(&self) -> Result<(VoxelCoord, VoxelCoord)> {
        let key = self.open_key()?;
        let dim = self.dataset.metadata.dim;
        Ok(self
            .dataset
            .valid_bounds
            .get(&key.1)
            .copied()
            .unwrap_or(([0, 0, 0], [dim[0] - 1, dim[1] - 1, dim[2] - 1])))
    }
}

/// Fill a full volume from a per-voxel closure, x-fastest
pub fn fill_volume(dim: VoxelCoord, f: impl Fn(usize, usize, usize) -> f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(dim[0] * dim[1] * dim[2]);
    for z in 0..dim[2] {
        for y in 0..dim[1] {
            for x in 0..dim[0] {
                data.push(f(x, y, z));
            }
        }
    }
    data
}
