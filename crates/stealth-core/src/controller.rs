//! Stealth controller
//!
//! Owns the session mode for one protected surface and wires the passcode
//! vault, the auto-lock watcher, the secret trigger and the notification
//! camouflage together. The controller is a plain state machine: every
//! handler takes the current instant, and timers are exposed as deadlines
//! through [`StealthController::next_deadline`] for the caller to honour.
//!
//! Mode transitions:
//!
//! ```text
//!   decoy ──trigger / notification──▶ awaiting_passcode
//!   awaiting_passcode ──verify ok──▶ protected
//!   awaiting_passcode ──cancel / reject / hidden──▶ decoy
//!   protected ──re-lock / manual / render failure──▶ decoy
//! ```
//!
//! `protected` is only ever entered from `awaiting_passcode` after the vault
//! accepted a passcode.

use crate::auto_lock::{AutoLockWatcher, Visibility};
use crate::camouflage::{
    NotificationCamouflage, NotificationId, PendingCamouflagedNotification, SensitiveEvent,
};
use crate::entry::PasscodeEntry;
use crate::host::{HostShell, PasscodeFlow};
use crate::pin_vault::PinVault;
use crate::session::{LockReason, Mode, StealthSession, StoredMode};
use crate::trigger::{Activation, SecretTriggerDetector};
use crate::{Error, Result};
use chrono::Utc;
use stealth_params::{DecoyIdentity, PinKdfParams, ProtectedSurface, SurfaceConfig, TimingParams};
use stealth_storage_sqlite::{keys, SessionStore};
use std::sync::Arc;
use std::time::Instant;

/// Where a sensitive event went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRouting {
    /// Handed to the open protected surface
    Delivered,
    /// Shown as decoy content
    Camouflaged(NotificationId),
}

/// State machine for one protected surface
pub struct StealthController<S, H> {
    surface: ProtectedSurface,
    identity: DecoyIdentity,
    title: String,
    store: Arc<S>,
    host: H,
    vault: PinVault<S>,
    watcher: AutoLockWatcher,
    trigger: SecretTriggerDetector,
    camouflage: NotificationCamouflage,
    entry: PasscodeEntry,
    mode: Mode,
    /// Last value known to be in `stealth.mode`
    persisted_mode: Option<&'static str>,
    last_transition_at: Instant,
    /// Event to open once the passcode is accepted
    open_event: Option<String>,
    displayed: Option<NotificationId>,
}

impl<S: SessionStore + Sync, H: HostShell> StealthController<S, H> {
    /// Load the session for `config.surface` and show the decoy.
    ///
    /// Always starts in decoy. A stored `protected` (left by a run that
    /// never unloaded) is downgraded and the downgrade persisted. Storage
    /// failures are logged and otherwise treated as a decoy session.
    pub fn load(
        config: &SurfaceConfig,
        timing: TimingParams,
        kdf: PinKdfParams,
        store: Arc<S>,
        mut host: H,
        now: Instant,
    ) -> Self {
        let surface = config.surface;
        let identity = config.identity();
        let title = config.cover_title();

        let stored = StoredMode::read(store.as_ref());
        match stored {
            StoredMode::Protected => {
                tracing::info!("Surface {} was left open, resuming disguised", surface)
            }
            StoredMode::Unknown => {
                tracing::warn!("Surface {} has no readable mode, resuming disguised", surface)
            }
            StoredMode::Fresh | StoredMode::Decoy => {}
        }

        let vault = PinVault::load(Arc::clone(&store), kdf);

        host.set_title(&title);
        host.show_decoy(identity);

        let mut controller = Self {
            surface,
            identity,
            title,
            store,
            host,
            vault,
            watcher: AutoLockWatcher::new(&timing),
            trigger: SecretTriggerDetector::new(
                identity.trigger_element(),
                timing.double_activation_window,
            ),
            camouflage: NotificationCamouflage::new(identity, timing.notification_display),
            entry: PasscodeEntry::new(),
            mode: Mode::Decoy,
            persisted_mode: (stored == StoredMode::Decoy).then_some(Mode::Decoy.persisted()),
            last_transition_at: now,
            open_event: None,
            displayed: None,
        };

        controller.persist_mode();
        controller.persist_title();

        tracing::debug!(
            "Surface {} loaded as {} (passcode configured: {})",
            surface,
            identity,
            controller.vault.is_configured()
        );
        controller
    }

    // ---- Decoy-side input ----

    /// Pointer activation on a decoy element
    pub fn on_trigger_activation(&mut self, element: &str, now: Instant) {
        if self.mode != Mode::Decoy {
            return;
        }

        match self.trigger.on_activation(element, now) {
            Activation::Ignored => {}
            Activation::Single => self.host.cover_action(self.identity.cover_action()),
            Activation::UnlockRequested => {
                self.open_event = None;
                self.enter_awaiting(now);
            }
        }
    }

    /// The user acted on a camouflaged notification.
    ///
    /// Goes through the passcode entry like the secret trigger. Returns
    /// `false` for unknown or expired notifications.
    pub fn on_notification_activated(&mut self, id: NotificationId, now: Instant) -> bool {
        if self.mode != Mode::Decoy {
            return false;
        }
        self.expire_notifications(now);

        let Some(pending) = self.camouflage.take(id) else {
            return false;
        };
        self.open_event = Some(pending.event_id().to_string());
        drop(pending);
        self.sync_displayed();

        self.enter_awaiting(now);
        true
    }

    /// Sensitive event from the messaging or data layer
    pub fn on_sensitive_event(&mut self, event: SensitiveEvent, now: Instant) -> EventRouting {
        if self.mode == Mode::Protected {
            self.host.deliver_event(event);
            return EventRouting::Delivered;
        }

        self.expire_notifications(now);
        let id = self.camouflage.push(event, now);
        self.sync_displayed();
        EventRouting::Camouflaged(id)
    }

    // ---- Passcode entry ----

    /// One digit typed into the overlay; the fourth submits
    pub fn on_digit(&mut self, digit: u8, now: Instant) {
        if self.mode != Mode::AwaitingPasscode || !self.entry.push_digit(digit) {
            return;
        }
        self.host.update_passcode_entry(self.entry.len());

        if self.entry.is_complete() {
            let candidate = self.entry.take();
            self.submit(&candidate, now);
        }
    }

    /// Remove the last typed digit
    pub fn on_backspace(&mut self) {
        if self.mode != Mode::AwaitingPasscode || self.entry.is_empty() {
            return;
        }
        self.entry.backspace();
        self.host.update_passcode_entry(self.entry.len());
    }

    /// Submit a whole passcode. Returns whether the protected surface opened.
    pub fn submit_passcode(&mut self, candidate: &str, now: Instant) -> bool {
        if self.mode != Mode::AwaitingPasscode {
            return false;
        }
        self.entry.clear();
        self.submit(candidate, now)
    }

    /// Dismiss the overlay
    pub fn cancel_passcode(&mut self, now: Instant) {
        if self.mode == Mode::AwaitingPasscode {
            self.enter_decoy(LockReason::Cancelled, now);
        }
    }

    fn submit(&mut self, candidate: &str, now: Instant) -> bool {
        let accepted = if self.vault.is_configured() {
            match self.vault.verify(candidate) {
                Ok(matched) => matched,
                Err(e) => {
                    tracing::warn!("Passcode check failed: {}", e);
                    false
                }
            }
        } else {
            match self.vault.setup(candidate) {
                Ok(()) => true,
                Err(Error::InvalidFormat) => false,
                Err(e) => {
                    tracing::warn!("Passcode setup failed: {}", e);
                    false
                }
            }
        };

        if accepted {
            self.enter_protected(now)
        } else {
            // Same feedback for a bad format and a wrong passcode.
            self.host.passcode_rejected();
            self.enter_decoy(LockReason::PasscodeRejected, now);
            false
        }
    }

    // ---- Protected-side input ----

    /// Low-visibility "back to cover" affordance
    pub fn return_to_decoy(&mut self, now: Instant) {
        if self.mode == Mode::Protected {
            self.enter_decoy(LockReason::Manual, now);
        }
    }

    /// The protected surface failed after mounting
    pub fn report_protected_failure(&mut self, now: Instant) {
        if self.mode == Mode::Protected {
            self.enter_decoy(LockReason::RenderFailure, now);
        }
    }

    /// Change the passcode; only while the protected surface is open
    pub fn change_passcode(&mut self, current: &str, new: &str) -> Result<()> {
        if self.mode != Mode::Protected {
            return Err(Error::NotProtected);
        }
        self.vault.change(current, new)
    }

    // ---- Lifecycle signals ----

    /// Page visibility changed
    pub fn on_visibility_change(&mut self, visibility: Visibility, now: Instant) {
        match self.mode {
            Mode::Protected => {
                if let Some(reason) = self.watcher.on_visibility(visibility) {
                    self.enter_decoy(reason, now);
                }
            }
            Mode::AwaitingPasscode if visibility == Visibility::Hidden => {
                self.enter_decoy(LockReason::TabHidden, now);
            }
            _ => {}
        }
    }

    /// Window focus changed
    pub fn on_focus_change(&mut self, focused: bool, now: Instant) {
        if let Some(reason) = self.watcher.on_focus(focused, now) {
            self.enter_decoy(reason, now);
        }
    }

    /// User activity on the page
    pub fn on_user_activity(&mut self, now: Instant) {
        self.watcher.on_activity(now);
    }

    /// Page is going away. Leaves `decoy` in storage and drops every timer.
    pub fn on_page_unload(&mut self, now: Instant) {
        match self.mode {
            Mode::Protected => {
                if let Some(reason) = self.watcher.on_unload() {
                    self.enter_decoy(reason, now);
                }
            }
            Mode::AwaitingPasscode => self.enter_decoy(LockReason::Unload, now),
            Mode::Decoy => self.persist_mode(),
        }

        self.camouflage.clear();
        self.sync_displayed();
        self.trigger.reset();
    }

    /// Fire every deadline at or before `now`
    pub fn poll_timers(&mut self, now: Instant) {
        self.expire_notifications(now);

        if self.mode == Mode::Protected {
            if let Some(reason) = self.watcher.poll(now) {
                self.enter_decoy(reason, now);
            }
        }
    }

    /// Earliest instant at which `poll_timers` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.watcher.next_deadline(), self.camouflage.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // ---- Accessors ----

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Protected surface behind this controller
    pub fn surface(&self) -> ProtectedSurface {
        self.surface
    }

    /// Decoy identity on display
    pub fn identity(&self) -> DecoyIdentity {
        self.identity
    }

    /// Whether a passcode exists (or might exist but is unreadable)
    pub fn is_configured(&self) -> bool {
        self.vault.is_configured()
    }

    /// Snapshot of the session
    pub fn session(&self) -> StealthSession {
        StealthSession {
            surface: self.surface,
            mode: self.mode,
            decoy_identity: self.identity,
            decoy_title: self.title.clone(),
            last_transition_at: self.last_transition_at,
        }
    }

    /// Notification on display, if any
    pub fn displayed_notification(&self) -> Option<&PendingCamouflagedNotification> {
        self.camouflage.current()
    }

    /// Number of queued camouflaged notifications
    pub fn pending_notifications(&self) -> usize {
        self.camouflage.len()
    }

    /// Digits typed into the overlay
    pub fn entered_digits(&self) -> usize {
        self.entry.len()
    }

    /// Cover content for the decoy surface
    pub fn decoy_feed(&self, count: usize) -> Vec<String> {
        self.camouflage
            .writer()
            .feed(Utc::now().date_naive(), count)
    }

    /// Host shell
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Host shell, mutably
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // ---- Transitions ----

    fn enter_awaiting(&mut self, now: Instant) {
        self.mode = Mode::AwaitingPasscode;
        self.last_transition_at = now;
        self.trigger.reset();
        self.entry.clear();

        let flow = if self.vault.is_configured() {
            PasscodeFlow::Verify
        } else {
            PasscodeFlow::Setup
        };
        self.host.show_passcode_entry(flow);
        tracing::debug!("Surface {}: passcode requested", self.surface);
    }

    fn enter_protected(&mut self, now: Instant) -> bool {
        let open_event = self.open_event.take();
        if self
            .host
            .mount_protected(self.surface, open_event.as_deref())
            .is_err()
        {
            // Nothing mounted; the decoy is still under the overlay.
            tracing::warn!("Surface {}: protected view failed to mount", self.surface);
            self.enter_decoy(LockReason::RenderFailure, now);
            return false;
        }
        self.host.hide_passcode_entry();

        self.mode = Mode::Protected;
        self.last_transition_at = now;
        self.watcher.arm(now);
        self.camouflage.clear();
        self.sync_displayed();
        self.persist_mode();

        tracing::info!("Surface {}: protected view opened", self.surface);
        true
    }

    fn enter_decoy(&mut self, reason: LockReason, now: Instant) {
        let from = self.mode;
        match from {
            Mode::Decoy => return,
            Mode::AwaitingPasscode => {
                self.entry.clear();
                self.host.hide_passcode_entry();
            }
            Mode::Protected => {
                self.watcher.disarm();
                self.host.unmount_protected();
                self.host.set_title(&self.title);
                self.host.show_decoy(self.identity);
            }
        }

        self.mode = Mode::Decoy;
        self.last_transition_at = now;
        self.open_event = None;
        self.trigger.reset();
        self.persist_mode();

        if from == Mode::Protected {
            tracing::info!("Surface {}: re-locked ({})", self.surface, reason);
        } else {
            tracing::debug!("Surface {}: passcode entry closed ({})", self.surface, reason);
        }
    }

    // ---- Notifications ----

    fn expire_notifications(&mut self, now: Instant) {
        if self.camouflage.expire(now) > 0 {
            self.sync_displayed();
        }
    }

    /// Keep the host showing exactly the oldest queued notification
    fn sync_displayed(&mut self) {
        let current = self
            .camouflage
            .current()
            .map(|pending| (pending.id(), pending.decoy_text().to_string()));

        if self.displayed == current.as_ref().map(|(id, _)| *id) {
            return;
        }
        if let Some(old) = self.displayed.take() {
            self.host.hide_notification(old);
        }
        if let Some((id, text)) = current {
            self.host.show_notification(id, &text);
            self.displayed = Some(id);
        }
    }

    // ---- Persistence ----

    fn persist_mode(&mut self) {
        let value = self.mode.persisted();
        if self.persisted_mode == Some(value) {
            return;
        }

        let stamp = Utc::now().to_rfc3339();
        let written = self
            .store
            .set(keys::MODE, value)
            .and_then(|()| self.store.set(keys::LAST_TRANSITION_AT, &stamp));

        match written {
            Ok(()) => self.persisted_mode = Some(value),
            Err(e) => {
                tracing::warn!("Surface {}: failed to persist mode: {}", self.surface, e);
                self.persisted_mode = None;
            }
        }
    }

    fn persist_title(&self) {
        match self.store.get(keys::DECOY_TITLE) {
            Ok(Some(stored)) if stored == self.title => {}
            _ => {
                if let Err(e) = self.store.set(keys::DECOY_TITLE, &self.title) {
                    tracing::warn!("Surface {}: failed to persist title: {}", self.surface, e);
                }
            }
        }
    }
}

impl<S, H> std::fmt::Debug for StealthController<S, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthController")
            .field("surface", &self.surface)
            .field("identity", &self.identity)
            .field("mode", &self.mode)
            .field("pending_notifications", &self.camouflage.len())
            .finish_non_exhaustive()
    }
}
