//! Stealth access control
//!
//! Hides a protected surface (the asset vault or private messaging) behind a
//! decoy application. The decoy is unlocked by a secret double activation
//! followed by a four-digit passcode, and the disguise comes back on its own
//! when the page is hidden, loses focus for too long, or unloads. Sensitive
//! events that arrive while disguised are shown as ordinary decoy content.
//!
//! [`StealthController`] is the synchronous state machine; [`driver`] runs it
//! on tokio and turns its deadlines into timers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auto_lock;
pub mod camouflage;
pub mod controller;
pub mod driver;
pub mod entry;
pub mod error;
pub mod host;
pub mod pin_vault;
pub mod session;
pub mod trigger;

pub use auto_lock::{AutoLockWatcher, Visibility};
pub use camouflage::{
    BannedTerms, DecoyWriter, NotificationCamouflage, NotificationId,
    PendingCamouflagedNotification, SensitiveEvent,
};
pub use controller::{EventRouting, StealthController};
pub use driver::{DriverHandle, HostEvent};
pub use entry::PasscodeEntry;
pub use error::{Error, Result};
pub use host::{HostCall, HostShell, MockHost, PasscodeFlow, SurfaceError};
pub use pin_vault::PinVault;
pub use session::{LockReason, Mode, StealthSession};
pub use trigger::{Activation, SecretTriggerDetector};

pub use stealth_params::{
    DecoyIdentity, PinKdfParams, ProtectedSurface, StealthConfig, SurfaceConfig, TimingParams,
};
