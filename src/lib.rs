//! Layered VDC - multiresolution access to terrain-following volumes
//!
//! A pure Rust access engine for layered (terrain-following) scientific
//! grids stored in block-compressed, wavelet-encoded multiresolution
//! collections. Data comes back either in its native non-uniform vertical
//! layering or resampled onto a uniform vertical grid of user-selectable
//! height.
//!
//! # Features
//!
//! - Region and block reads at any refinement level of the hierarchy
//! - Column-wise vertical interpolation with per-variable out-of-domain
//!   extrapolation constants
//! - Single-slot elevation caching so repeated reads of one region decode
//!   the terrain only once
//! - Resolution- and grid-height-aware valid-region queries and voxel/user
//!   coordinate mapping
//!
//! The wavelet codec itself is an external collaborator: implement the
//! [`BlockRegionReader`]/[`BlockReaderFactory`] traits over it and inject
//! them at construction.
//!
//! # Example
//!
//! ```rust,ignore
//! use layered_vdc::LayeredDataAccess;
//!
//! # fn example(factory: &dyn layered_vdc::BlockReaderFactory) -> layered_vdc::Result<()> {
//! let mut vdc = LayeredDataAccess::from_file("/data/storm/dataset.vdc.json", factory, 4)?;
//! vdc.set_grid_height(512)?;
//!
//! vdc.open_variable_read(0, "T", 2)?;
//! let region = vdc.read_region([0, 0, 0], [127, 127, 511])?;
//! vdc.close_variable()?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod cache;
pub mod error;
mod interpolate;
pub mod mapper;
pub mod metadata;
pub mod reader;
pub mod region;
pub mod testdata;
pub mod types;

// Re-exports
pub use access::LayeredDataAccess;
pub use cache::ElevationCache;
pub use error::{Result, VdcError};
pub use mapper::CoordinateMapper;
pub use metadata::{VdcMetadata, VdcVersion};
pub use reader::{BlockReaderFactory, BlockRegionReader};
pub use region::ValidRegionCalculator;
pub use types::{BlockCoord, Extents, GridType, LowHighVals, UserCoord, VoxelCoord};

/// Version of the layered VDC implementation
pub const LAYERED_VDC_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the distinguished variable carrying per-column terrain heights
pub const ELEVATION_VARIABLE: &str = "ELEVATION";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!LAYERED_VDC_VERSION.is_empty());
    }
}
