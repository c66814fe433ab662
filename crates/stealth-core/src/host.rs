//! Host application shell interface
//!
//! The controller decides what is on screen; the host draws it. Every call
//! here is fire-and-forget except mounting the protected surface, whose
//! failure sends the controller back to the decoy.

use crate::camouflage::{NotificationId, SensitiveEvent};
use parking_lot::Mutex;
use stealth_params::{CoverAction, DecoyIdentity, ProtectedSurface};
use std::sync::Arc;

/// Which passcode flow the entry overlay runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasscodeFlow {
    /// First run: the digits become the passcode
    Setup,
    /// Digits are checked against the stored passcode
    Verify,
}

/// Opaque failure to render the protected surface.
///
/// Carries no detail on purpose: nothing from it may reach the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceError;

/// Render surface provided by the host application
pub trait HostShell: Send {
    /// Show the decoy surface for `identity`
    fn show_decoy(&mut self, identity: DecoyIdentity);

    /// Set the document title seen in tabs and task switchers
    fn set_title(&mut self, title: &str);

    /// Run the cover behaviour of a single trigger activation
    fn cover_action(&mut self, action: CoverAction);

    /// Overlay the passcode entry on the decoy
    fn show_passcode_entry(&mut self, flow: PasscodeFlow);

    /// Number of digits entered so far
    fn update_passcode_entry(&mut self, filled: usize);

    /// Shake and clear the entry. Same feedback for every failure.
    fn passcode_rejected(&mut self);

    /// Remove the entry overlay
    fn hide_passcode_entry(&mut self);

    /// Hand the screen to the protected surface, optionally opening one event
    fn mount_protected(
        &mut self,
        surface: ProtectedSurface,
        open_event: Option<&str>,
    ) -> Result<(), SurfaceError>;

    /// Tear the protected surface down
    fn unmount_protected(&mut self);

    /// Show a camouflaged notification
    fn show_notification(&mut self, id: NotificationId, text: &str);

    /// Remove a camouflaged notification
    fn hide_notification(&mut self, id: NotificationId);

    /// Pass a sensitive event to the open protected surface
    fn deliver_event(&mut self, event: SensitiveEvent);
}

/// Recorded host call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    /// `show_decoy`
    ShowDecoy(DecoyIdentity),
    /// `set_title`
    SetTitle(String),
    /// `cover_action`
    CoverAction(CoverAction),
    /// `show_passcode_entry`
    ShowPasscodeEntry(PasscodeFlow),
    /// `update_passcode_entry`
    UpdatePasscodeEntry(usize),
    /// `passcode_rejected`
    PasscodeRejected,
    /// `hide_passcode_entry`
    HidePasscodeEntry,
    /// `mount_protected`
    MountProtected(ProtectedSurface, Option<String>),
    /// `unmount_protected`
    UnmountProtected,
    /// `show_notification`
    ShowNotification(NotificationId, String),
    /// `hide_notification`
    HideNotification(NotificationId),
    /// `deliver_event`, by event id
    DeliverEvent(String),
}

#[derive(Debug, Default)]
struct MockHostState {
    calls: Vec<HostCall>,
    fail_mounts: bool,
}

/// Recording host for tests; clones share one call log
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    state: Arc<Mutex<MockHostState>>,
}

impl MockHost {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `mount_protected` fail
    pub fn set_fail_mounts(&self, fail: bool) {
        self.state.lock().fail_mounts = fail;
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().calls.clone()
    }

    /// Drop the call log
    pub fn clear(&self) {
        self.state.lock().calls.clear();
    }

    /// Every string that reached the screen: titles and notification texts
    pub fn rendered_text(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                HostCall::SetTitle(text) | HostCall::ShowNotification(_, text) => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HostCall) {
        self.state.lock().calls.push(call);
    }
}

impl HostShell for MockHost {
    fn show_decoy(&mut self, identity: DecoyIdentity) {
        self.record(HostCall::ShowDecoy(identity));
    }

    fn set_title(&mut self, title: &str) {
        self.record(HostCall::SetTitle(title.to_string()));
    }

    fn cover_action(&mut self, action: CoverAction) {
        self.record(HostCall::CoverAction(action));
    }

    fn show_passcode_entry(&mut self, flow: PasscodeFlow) {
        self.record(HostCall::ShowPasscodeEntry(flow));
    }

    fn update_passcode_entry(&mut self, filled: usize) {
        self.record(HostCall::UpdatePasscodeEntry(filled));
    }

    fn passcode_rejected(&mut self) {
        self.record(HostCall::PasscodeRejected);
    }

    fn hide_passcode_entry(&mut self) {
        self.record(HostCall::HidePasscodeEntry);
    }

    fn mount_protected(
        &mut self,
        surface: ProtectedSurface,
        open_event: Option<&str>,
    ) -> Result<(), SurfaceError> {
        self.record(HostCall::MountProtected(surface, open_event.map(str::to_string)));
        if self.state.lock().fail_mounts {
            Err(SurfaceError)
        } else {
            Ok(())
        }
    }

    fn unmount_protected(&mut self) {
        self.record(HostCall::UnmountProtected);
    }

    fn show_notification(&mut self, id: NotificationId, text: &str) {
        self.record(HostCall::ShowNotification(id, text.to_string()));
    }

    fn hide_notification(&mut self, id: NotificationId) {
        self.record(HostCall::HideNotification(id));
    }

    fn deliver_event(&mut self, event: SensitiveEvent) {
        self.record(HostCall::DeliverEvent(event.event_id));
    }
}
