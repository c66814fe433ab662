//! Timing parameters for re-locking, gestures and notifications

use std::time::Duration;

/// Number of digits in a passcode
pub const PASSCODE_LENGTH: usize = 4;

/// Unfocused time tolerated before a re-lock (30 seconds)
pub const DEFAULT_BLUR_GRACE_MS: u64 = 30_000;

/// Maximum gap between the two activations of the secret trigger
pub const DEFAULT_DOUBLE_ACTIVATION_WINDOW_MS: u64 = 500;

/// How long a camouflaged notification stays eligible for display
pub const DEFAULT_NOTIFICATION_DISPLAY_MS: u64 = 8_000;

/// Resolved timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingParams {
    /// Grace period after window blur
    pub blur_grace: Duration,
    /// Double-activation detection window
    pub double_activation_window: Duration,
    /// Display lifetime of a camouflaged notification
    pub notification_display: Duration,
    /// Optional inactivity re-lock
    pub idle_relock_after: Option<Duration>,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            blur_grace: Duration::from_millis(DEFAULT_BLUR_GRACE_MS),
            double_activation_window: Duration::from_millis(DEFAULT_DOUBLE_ACTIVATION_WINDOW_MS),
            notification_display: Duration::from_millis(DEFAULT_NOTIFICATION_DISPLAY_MS),
            idle_relock_after: None,
        }
    }
}
