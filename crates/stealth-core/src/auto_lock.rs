//! Automatic re-locking on page lifecycle signals
//!
//! The watcher only acts while armed, which the controller keeps in step
//! with the protected mode. It never sleeps itself: it records deadlines
//! and reports a re-lock when the caller polls past one.
//!
//! - Hidden page: immediate re-lock, any pending blur deadline is discarded.
//! - Blur: re-lock once the window has stayed unfocused for the grace
//!   period; regaining focus first cancels it.
//! - Unload: immediate re-lock so the next load starts disguised.
//! - Idle (optional): re-lock after a period without user activity.

use crate::session::LockReason;
use stealth_params::TimingParams;
use std::time::{Duration, Instant};

/// Page visibility as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Page is on screen
    Visible,
    /// Page is in a background tab or the app is switched away
    Hidden,
}

/// Lifecycle watcher for the protected surface
#[derive(Debug)]
pub struct AutoLockWatcher {
    blur_grace: Duration,
    idle_after: Option<Duration>,
    armed: bool,
    focused: bool,
    blur_deadline: Option<Instant>,
    last_activity: Option<Instant>,
}

impl AutoLockWatcher {
    /// Create a disarmed watcher
    pub fn new(timing: &TimingParams) -> Self {
        Self {
            blur_grace: timing.blur_grace,
            idle_after: timing.idle_relock_after,
            armed: false,
            focused: true,
            blur_deadline: None,
            last_activity: None,
        }
    }

    /// Start watching; called when the protected surface opens
    pub fn arm(&mut self, now: Instant) {
        self.armed = true;
        self.last_activity = Some(now);
        self.blur_deadline = if self.focused {
            None
        } else {
            Some(now + self.blur_grace)
        };
        tracing::debug!("Auto-lock armed");
    }

    /// Stop watching and drop every pending deadline
    pub fn disarm(&mut self) {
        if self.armed {
            tracing::debug!("Auto-lock disarmed");
        }
        self.armed = false;
        self.blur_deadline = None;
        self.last_activity = None;
    }

    /// Whether the watcher is active
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Visibility change
    pub fn on_visibility(&mut self, visibility: Visibility) -> Option<LockReason> {
        match visibility {
            Visibility::Hidden if self.armed => {
                // Takes precedence over a pending blur deadline.
                self.blur_deadline = None;
                Some(LockReason::TabHidden)
            }
            _ => None,
        }
    }

    /// Focus change. Focus is tracked while disarmed so arming mid-blur starts the clock.
    ///
    /// Focus returning at or after the blur deadline reports the re-lock
    /// instead of cancelling it.
    pub fn on_focus(&mut self, focused: bool, now: Instant) -> Option<LockReason> {
        self.focused = focused;
        if !self.armed {
            return None;
        }
        if focused {
            match self.blur_deadline.take() {
                Some(deadline) if now >= deadline => return Some(LockReason::BlurTimeout),
                Some(_) => tracing::debug!("Focus regained, blur re-lock cancelled"),
                None => {}
            }
        } else if self.blur_deadline.is_none() {
            self.blur_deadline = Some(now + self.blur_grace);
        }
        None
    }

    /// Page unload
    pub fn on_unload(&mut self) -> Option<LockReason> {
        self.armed.then_some(LockReason::Unload)
    }

    /// User activity (pointer, keys, scroll) on the protected surface.
    /// Activity after the idle deadline does not revive the session.
    pub fn on_activity(&mut self, now: Instant) {
        if self.armed && !self.idle_deadline().is_some_and(|deadline| now >= deadline) {
            self.last_activity = Some(now);
        }
    }

    /// Report a re-lock if a deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<LockReason> {
        if !self.armed {
            return None;
        }
        if self.blur_deadline.is_some_and(|deadline| now >= deadline) {
            return Some(LockReason::BlurTimeout);
        }
        if self.idle_deadline().is_some_and(|deadline| now >= deadline) {
            return Some(LockReason::Idle);
        }
        None
    }

    /// Pending blur deadline, if any
    pub fn blur_deadline(&self) -> Option<Instant> {
        self.blur_deadline
    }

    fn idle_deadline(&self) -> Option<Instant> {
        match (self.idle_after, self.last_activity) {
            (Some(idle), Some(last)) => Some(last + idle),
            _ => None,
        }
    }

    /// Earliest instant at which `poll` can report something
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.armed {
            return None;
        }
        match (self.blur_deadline, self.idle_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
