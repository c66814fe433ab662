//! Durable client-side state for stealth access control
//!
//! Provides the key/value seam the controller persists its session through,
//! an in-memory implementation, a SQLite implementation with schema
//! migrations, and the salted passcode verifier.
//!
//! ## Persisted layout
//!
//! - `stealth.mode`: `decoy` or `protected`
//! - `stealth.passcodeConfigured`: `true` or `false`
//! - `stealth.passcodeVerifier`: Argon2id PHC string
//! - `stealth.decoyTitle`: cover title
//! - `stealth.lastTransitionAt`: RFC 3339 timestamp

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod database;
pub mod error;
pub mod migrations;
pub mod security;
pub mod store;

pub use database::Database;
pub use error::{Error, Result};
pub use security::{is_well_formed, PasscodeVerifier};
pub use store::{keys, MemoryStore, SessionStore, SqliteStore};
