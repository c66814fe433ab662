//! Secret trigger detection
//!
//! Two activations of the trigger element no more than `window` apart
//! request the passcode. Anything else is an ordinary click.

use std::time::{Duration, Instant};

/// Result of one pointer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Not the trigger element
    Ignored,
    /// First activation; the cover behaviour runs
    Single,
    /// Second activation inside the window
    UnlockRequested,
}

/// Double-activation detector bound to one element
#[derive(Debug)]
pub struct SecretTriggerDetector {
    element: String,
    window: Duration,
    pending: Option<Instant>,
}

impl SecretTriggerDetector {
    /// Detector for `element` with the given window
    pub fn new(element: impl Into<String>, window: Duration) -> Self {
        Self {
            element: element.into(),
            window,
            pending: None,
        }
    }

    /// Element this detector watches
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Feed one activation
    pub fn on_activation(&mut self, element: &str, now: Instant) -> Activation {
        if element != self.element {
            self.pending = None;
            return Activation::Ignored;
        }

        match self.pending.take() {
            Some(first) if now.saturating_duration_since(first) <= self.window => {
                Activation::UnlockRequested
            }
            // No earlier click, or it is too old to pair with this one.
            _ => {
                self.pending = Some(now);
                Activation::Single
            }
        }
    }

    /// Forget a half-finished gesture
    pub fn reset(&mut self) {
        self.pending = None;
    }
}
