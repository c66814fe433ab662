//! Async driver
//!
//! Runs a [`StealthController`] on a tokio task. Host events arrive over a
//! channel; between events the task sleeps until the controller's next
//! deadline. Events are always taken before an expired timer, so a hidden
//! page re-locks before a blur deadline that fell due at the same moment.

use crate::auto_lock::Visibility;
use crate::camouflage::{NotificationId, SensitiveEvent};
use crate::controller::StealthController;
use crate::host::HostShell;
use crate::session::Mode;
use crate::{Error, Result};
use stealth_storage_sqlite::SessionStore;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const EVENT_QUEUE_DEPTH: usize = 64;

/// Input from the host application
#[derive(Debug)]
pub enum HostEvent {
    /// Pointer activation on a decoy element
    Activation(String),
    /// Camouflaged notification clicked
    NotificationActivated(NotificationId),
    /// Digit typed into the passcode overlay
    Digit(u8),
    /// Backspace in the passcode overlay
    Backspace,
    /// Passcode overlay dismissed
    CancelPasscode,
    /// Page visibility changed
    Visibility(Visibility),
    /// Window focus changed
    Focus(bool),
    /// Pointer, key or scroll activity
    Activity,
    /// Sensitive event from the data layer
    Sensitive(SensitiveEvent),
    /// "Back to cover" affordance
    ReturnToDecoy,
    /// Protected surface crashed
    ProtectedFailure,
    /// Page is unloading
    Unload,
    /// Stop the driver
    Shutdown,
}

impl<S: SessionStore + Sync, H: HostShell> StealthController<S, H> {
    /// Route one host event to its handler.
    ///
    /// Deadlines that fell due before the event are fired first, except for a
    /// hidden page, which re-locks on its own account.
    pub fn handle_event(&mut self, event: HostEvent, now: std::time::Instant) {
        if !matches!(event, HostEvent::Visibility(Visibility::Hidden)) {
            self.poll_timers(now);
        }

        match event {
            HostEvent::Activation(element) => self.on_trigger_activation(&element, now),
            HostEvent::NotificationActivated(id) => {
                self.on_notification_activated(id, now);
            }
            HostEvent::Digit(digit) => self.on_digit(digit, now),
            HostEvent::Backspace => self.on_backspace(),
            HostEvent::CancelPasscode => self.cancel_passcode(now),
            HostEvent::Visibility(visibility) => self.on_visibility_change(visibility, now),
            HostEvent::Focus(focused) => self.on_focus_change(focused, now),
            HostEvent::Activity => self.on_user_activity(now),
            HostEvent::Sensitive(event) => {
                self.on_sensitive_event(event, now);
            }
            HostEvent::ReturnToDecoy => self.return_to_decoy(now),
            HostEvent::ProtectedFailure => self.report_protected_failure(now),
            HostEvent::Unload | HostEvent::Shutdown => self.on_page_unload(now),
        }
    }
}

/// Sending side of a running driver
#[derive(Debug, Clone)]
pub struct DriverHandle {
    events: mpsc::Sender<HostEvent>,
    mode: watch::Receiver<Mode>,
}

impl DriverHandle {
    /// Queue a host event
    pub async fn send(&self, event: HostEvent) -> Result<()> {
        self.events.send(event).await.map_err(|_| Error::DriverStopped)
    }

    /// Mode after the last processed event or timer
    pub fn mode(&self) -> Mode {
        *self.mode.borrow()
    }

    /// Subscribe to mode changes
    pub fn watch_mode(&self) -> watch::Receiver<Mode> {
        self.mode.clone()
    }

    /// Ask the driver to unload and stop
    pub async fn shutdown(&self) -> Result<()> {
        self.send(HostEvent::Shutdown).await
    }
}

/// Start driving `controller` on the current runtime.
///
/// The task ends on [`HostEvent::Shutdown`] or once every handle is dropped,
/// unloading the controller first, and hands the controller back.
pub fn spawn<S, H>(
    controller: StealthController<S, H>,
) -> (DriverHandle, JoinHandle<StealthController<S, H>>)
where
    S: SessionStore + Sync + 'static,
    H: HostShell + 'static,
{
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let (mode_tx, mode_rx) = watch::channel(controller.mode());

    let task = tokio::spawn(run(controller, events_rx, mode_tx));
    let handle = DriverHandle {
        events: events_tx,
        mode: mode_rx,
    };
    (handle, task)
}

async fn run<S, H>(
    mut controller: StealthController<S, H>,
    mut events: mpsc::Receiver<HostEvent>,
    mode: watch::Sender<Mode>,
) -> StealthController<S, H>
where
    S: SessionStore + Sync,
    H: HostShell,
{
    tracing::debug!("Driver started for surface {}", controller.surface());

    loop {
        let deadline = controller.next_deadline();

        tokio::select! {
            biased;

            event = events.recv() => match event {
                Some(HostEvent::Shutdown) | None => break,
                Some(event) => controller.handle_event(event, Instant::now().into_std()),
            },
            _ = sleep_until(deadline) => {
                controller.poll_timers(Instant::now().into_std());
            }
        }

        mode.send_if_modified(|current| {
            let changed = *current != controller.mode();
            *current = controller.mode();
            changed
        });
    }

    // Pending timers die with the loop; leave storage disguised.
    controller.on_page_unload(Instant::now().into_std());
    mode.send_replace(controller.mode());

    tracing::debug!("Driver stopped for surface {}", controller.surface());
    controller
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
