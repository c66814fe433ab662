//! Error types

/// Stealth access errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Passcode is not exactly four digits
    #[error("Passcode must be exactly four digits")]
    InvalidFormat,

    /// Setup called after a passcode already exists
    #[error("Passcode already configured")]
    AlreadyConfigured,

    /// Verify called before any passcode exists
    #[error("Passcode not configured")]
    NotConfigured,

    /// Current passcode did not match during a change
    #[error("Passcode mismatch")]
    Mismatch,

    /// Operation needs the protected surface to be open
    #[error("Protected surface is not open")]
    NotProtected,

    /// Passcode record could not be read at load time
    #[error("Passcode record unavailable")]
    Unavailable,

    /// Driver task is gone
    #[error("Driver stopped")]
    DriverStopped,

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] stealth_storage_sqlite::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
