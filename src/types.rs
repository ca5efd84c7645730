//! Core data types for layered VDC volumes

use serde::{Deserialize, Serialize};

/// Integer voxel coordinates, x/y/z order
pub type VoxelCoord = [usize; 3];

/// Integer block coordinates, x/y/z order
pub type BlockCoord = [usize; 3];

/// Floating point coordinates in the user-defined space, x/y/z order
pub type UserCoord = [f64; 3];

/// Extrapolation constant substituted for voxels below a column's terrain floor
pub const BELOW_GRID: f32 = -1.0e30;

/// Extrapolation constant substituted for voxels above a column's native top layer
pub const ABOVE_GRID: f32 = 1.0e30;

/// Grid types supported by a VDC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridType {
    /// Uniformly sampled Cartesian grid
    Regular,
    /// Terrain-following grid whose vertical sample spacing varies per column
    Layered,
}

impl GridType {
    pub fn is_layered(&self) -> bool {
        matches!(self, GridType::Layered)
    }
}

/// Domain extents in user coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    pub min: UserCoord,
    pub max: UserCoord,
}

impl Extents {
    pub fn new(min: UserCoord, max: UserCoord) -> Self {
        Self { min, max }
    }

    /// Length of the domain along one axis
    pub fn span(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i].is_finite() && self.max[i].is_finite() && self.min[i] < self.max[i])
    }
}

/// Per-variable extrapolation constants for voxels outside a column's
/// terrain-bounded vertical range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowHighVals {
    /// Substituted below the terrain floor
    pub low: f32,
    /// Substituted above the native top layer
    pub high: f32,
}

impl LowHighVals {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }
}

impl Default for LowHighVals {
    fn default() -> Self {
        Self {
            low: BELOW_GRID,
            high: ABOVE_GRID,
        }
    }
}
