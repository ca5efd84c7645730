//! VDC metadata descriptor
//!
//! The descriptor captures everything the access layer needs to know about a
//! dataset without touching the compressed blocks themselves: grid type,
//! finest-level dimensions, block size, the depth of the multiresolution
//! hierarchy, user-coordinate extents, and the variable inventory.

use crate::error::{Result, VdcError};
use crate::types::{BlockCoord, Extents, GridType, VoxelCoord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Max number of forward transforms permitted
pub const MAX_LEVELS: usize = 16;

/// VDC descriptor format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdcVersion {
    pub major: u16,
    pub minor: u16,
}

impl VdcVersion {
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    pub fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub fn is_compatible(&self, other: &Self) -> bool {
        self.major == other.major
    }
}

impl Default for VdcVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Complete metadata for a layered VDC dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VdcMetadata {
    /// Descriptor format version
    pub version: VdcVersion,

    /// Grid type of the stored data
    pub grid_type: GridType,

    /// Volume dimensions in voxels at the finest refinement level
    pub dim: VoxelCoord,

    /// Block dimensions in voxels, fixed per dataset
    pub block_size: VoxelCoord,

    /// Number of refinement levels present; level 0 is the coarsest
    pub num_reflevels: usize,

    /// Domain extents in user coordinates
    pub extents: Extents,

    /// Names of all variables stored in the collection
    pub variable_names: Vec<String>,

    /// Number of timesteps in the collection
    pub num_timesteps: usize,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Custom metadata key-value pairs
    pub custom_metadata: HashMap<String, String>,
}

impl VdcMetadata {
    /// Create a new descriptor
    pub fn new(
        grid_type: GridType,
        dim: VoxelCoord,
        block_size: VoxelCoord,
        num_reflevels: usize,
        extents: Extents,
    ) -> Result<Self> {
        if dim.iter().any(|&d| d == 0) {
            return Err(VdcError::Metadata(
                "volume dimensions must be non-zero".to_string(),
            ));
        }
        if block_size.iter().any(|&b| b == 0) {
            return Err(VdcError::Metadata(
                "block dimensions must be non-zero".to_string(),
            ));
        }
        if num_reflevels == 0 || num_reflevels > MAX_LEVELS {
            return Err(VdcError::Metadata(format!(
                "number of refinement levels must be in 1..={}",
                MAX_LEVELS
            )));
        }
        if !extents.is_valid() {
            return Err(VdcError::Metadata(
                "domain extents must be finite and non-degenerate".to_string(),
            ));
        }

        Ok(Self {
            version: VdcVersion::default(),
            grid_type,
            dim,
            block_size,
            num_reflevels,
            extents,
            variable_names: Vec::new(),
            num_timesteps: 1,
            created_at: Utc::now(),
            custom_metadata: HashMap::new(),
        })
    }

    /// Set the variable inventory
    pub fn with_variable_names<S: Into<String>>(mut self, names: Vec<S>) -> Self {
        self.variable_names = names.into_iter().map(|n| n.into()).collect();
        self
    }

    /// Set the number of timesteps
    pub fn with_num_timesteps(mut self, num_timesteps: usize) -> Self {
        self.num_timesteps = num_timesteps;
        self
    }

    /// Add custom metadata
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom_metadata.insert(key.into(), value.into());
    }

    /// Get custom metadata
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.custom_metadata.get(key).map(|s| s.as_str())
    }

    /// Load a descriptor from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let metadata: VdcMetadata = serde_json::from_slice(&bytes)?;
        if !metadata.version.is_compatible(&VdcVersion::CURRENT) {
            return Err(VdcError::Metadata(format!(
                "descriptor version {}.{} is not compatible with {}.{}",
                metadata.version.major,
                metadata.version.minor,
                VdcVersion::CURRENT.major,
                VdcVersion::CURRENT.minor,
            )));
        }
        Ok(metadata)
    }

    /// Write the descriptor to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// The finest refinement level in the hierarchy
    pub fn max_refinement(&self) -> usize {
        self.num_reflevels - 1
    }

    /// Number of forward transforms separating `reflevel` from the finest level
    pub fn ldelta(&self, reflevel: usize) -> usize {
        self.num_reflevels - 1 - reflevel.min(self.max_refinement())
    }

    /// Volume dimensions in voxels at a refinement level
    pub fn dim_at_level(&self, reflevel: usize) -> VoxelCoord {
        let ld = self.ldelta(reflevel);
        [
            scale_dim(self.dim[0], ld),
            scale_dim(self.dim[1], ld),
            scale_dim(self.dim[2], ld),
        ]
    }

    /// Volume dimensions in blocks at a refinement level
    pub fn bdim_at_level(&self, reflevel: usize) -> BlockCoord {
        let dim = self.dim_at_level(reflevel);
        [
            dim[0].div_ceil(self.block_size[0]),
            dim[1].div_ceil(self.block_size[1]),
            dim[2].div_ceil(self.block_size[2]),
        ]
    }

    /// Total voxels in one block
    pub fn block_voxels(&self) -> usize {
        self.block_size.iter().product()
    }
}

/// Dimension of one axis after `ldelta` forward transforms, with the odd
/// remainder folded into an extra coarse sample
pub(crate) fn scale_dim(dim: usize, ldelta: usize) -> usize {
    let scaled = dim >> ldelta;
    if (scaled << ldelta) < dim {
        scaled + 1
    } else {
        scaled
    }
}
