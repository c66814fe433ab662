//! Stealth access parameters and constants
//!
//! This crate provides the protected surfaces, their decoy identities and
//! content vocabularies, the timing parameters for re-locking and gesture
//! detection, and the JSON configuration that ties them together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod identity;
pub mod timing;

pub use config::{PinKdfParams, StealthConfig, SurfaceConfig};
pub use identity::{CoverAction, DecoyIdentity, ProtectedSurface, Vocabulary};
pub use timing::{TimingParams, PASSCODE_LENGTH};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration rejected by validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Unknown surface or identity name
    #[error("Unknown name: {0}")]
    UnknownName(String),

    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
