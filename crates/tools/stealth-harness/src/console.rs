//! Host shell that prints what a real host would render

use parking_lot::Mutex;
use stealth_core::{
    HostShell, NotificationId, PasscodeFlow, SensitiveEvent, SurfaceError,
};
use stealth_params::{CoverAction, DecoyIdentity, ProtectedSurface};
use std::sync::Arc;

/// Console renderer
#[derive(Debug, Clone, Default)]
pub struct ConsoleHost {
    displayed: Arc<Mutex<Option<NotificationId>>>,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notification currently shown
    pub fn displayed(&self) -> Option<NotificationId> {
        *self.displayed.lock()
    }
}

impl HostShell for ConsoleHost {
    fn show_decoy(&mut self, identity: DecoyIdentity) {
        println!("[screen] {} cover", identity);
    }

    fn set_title(&mut self, title: &str) {
        println!("[title] {}", title);
    }

    fn cover_action(&mut self, action: CoverAction) {
        println!("[cover] {:?}", action);
    }

    fn show_passcode_entry(&mut self, flow: PasscodeFlow) {
        println!("[overlay] passcode entry ({:?})", flow);
    }

    fn update_passcode_entry(&mut self, filled: usize) {
        println!("[overlay] {}{}", "*".repeat(filled), "_".repeat(4usize.saturating_sub(filled)));
    }

    fn passcode_rejected(&mut self) {
        println!("[overlay] shake");
    }

    fn hide_passcode_entry(&mut self) {
        println!("[overlay] hidden");
    }

    fn mount_protected(
        &mut self,
        surface: ProtectedSurface,
        open_event: Option<&str>,
    ) -> Result<(), SurfaceError> {
        match open_event {
            Some(event) => println!("[screen] {} opened at event {}", surface, event),
            None => println!("[screen] {} opened", surface),
        }
        Ok(())
    }

    fn unmount_protected(&mut self) {
        println!("[screen] protected view closed");
    }

    fn show_notification(&mut self, id: NotificationId, text: &str) {
        *self.displayed.lock() = Some(id);
        println!("[notify] {}", text);
    }

    fn hide_notification(&mut self, id: NotificationId) {
        let mut displayed = self.displayed.lock();
        if *displayed == Some(id) {
            *displayed = None;
        }
        println!("[notify] dismissed");
    }

    fn deliver_event(&mut self, event: SensitiveEvent) {
        println!("[screen] event {} delivered", event.event_id);
    }
}
