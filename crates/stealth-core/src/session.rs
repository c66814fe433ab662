//! Stealth session state

use stealth_params::{DecoyIdentity, ProtectedSurface};
use stealth_storage_sqlite::{keys, SessionStore};
use std::fmt;
use std::time::Instant;

/// Which surface the user is looking at
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Decoy surface only
    #[default]
    Decoy,
    /// Passcode entry over the decoy
    AwaitingPasscode,
    /// Protected surface
    Protected,
}

impl Mode {
    /// Value written to `stealth.mode`.
    ///
    /// `AwaitingPasscode` is an overlay on the decoy and persists as `decoy`.
    pub const fn persisted(&self) -> &'static str {
        match self {
            Self::Decoy | Self::AwaitingPasscode => "decoy",
            Self::Protected => "protected",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Decoy => "decoy",
            Self::AwaitingPasscode => "awaiting_passcode",
            Self::Protected => "protected",
        })
    }
}

/// Why the controller went (back) to the decoy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// Page became hidden
    TabHidden,
    /// Window stayed unfocused past the grace period
    BlurTimeout,
    /// No user activity for the idle period
    Idle,
    /// Page is being unloaded
    Unload,
    /// Low-visibility in-app affordance
    Manual,
    /// Protected surface failed while rendering
    RenderFailure,
    /// Passcode entry dismissed
    Cancelled,
    /// Passcode failed format or comparison
    PasscodeRejected,
}

impl LockReason {
    /// Short name for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TabHidden => "tab_hidden",
            Self::BlurTimeout => "blur_timeout",
            Self::Idle => "idle",
            Self::Unload => "unload",
            Self::Manual => "manual",
            Self::RenderFailure => "render_failure",
            Self::Cancelled => "cancelled",
            Self::PasscodeRejected => "passcode_rejected",
        }
    }
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a previous run left in storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredMode {
    /// Nothing stored yet
    Fresh,
    /// `decoy`
    Decoy,
    /// `protected`, left behind by a run that never unloaded cleanly
    Protected,
    /// Unreadable or unrecognized value
    Unknown,
}

impl StoredMode {
    /// Read `stealth.mode`, mapping every failure to `Unknown`
    pub fn read<S: SessionStore + ?Sized>(store: &S) -> Self {
        match store.get(keys::MODE) {
            Ok(None) => Self::Fresh,
            Ok(Some(value)) => match value.as_str() {
                "decoy" => Self::Decoy,
                "protected" => Self::Protected,
                _ => Self::Unknown,
            },
            Err(e) => {
                tracing::warn!("Session mode unreadable, assuming decoy: {}", e);
                Self::Unknown
            }
        }
    }
}

/// Snapshot of a controller's session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthSession {
    /// Surface behind the disguise
    pub surface: ProtectedSurface,
    /// Current mode
    pub mode: Mode,
    /// Cover identity on display
    pub decoy_identity: DecoyIdentity,
    /// Title shown while disguised
    pub decoy_title: String,
    /// Time of the last mode change
    pub last_transition_at: Instant,
}
