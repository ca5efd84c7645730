//! Error types for layered VDC operations

use thiserror::Error;

/// Main error type for layered VDC operations
#[derive(Error, Debug)]
pub enum VdcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no data for variable '{varname}' at timestep {timestep}, refinement level {reflevel}")]
    DataUnavailable {
        timestep: usize,
        varname: String,
        reflevel: usize,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid region: {0}")]
    InvalidRegion(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("metadata error: {0}")]
    Metadata(String),
}

/// Specialized Result type for layered VDC operations
pub type Result<T> = std::result::Result<T, VdcError>;

impl From<serde_json::Error> for VdcError {
    fn from(err: serde_json::Error) -> Self {
        VdcError::Metadata(err.to_string())
    }
}
