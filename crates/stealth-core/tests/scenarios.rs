//! End-to-end controller scenarios
//!
//! Drives the synchronous controller with explicit instants, a recording
//! host and an in-memory store (SQLite where persistence across reloads
//! matters).

use parking_lot::Mutex;
use stealth_core::camouflage::contains_fragment_of;
use stealth_core::{
    EventRouting, HostCall, LockReason, MockHost, Mode, PasscodeFlow, PinKdfParams,
    ProtectedSurface, SensitiveEvent, StealthController, SurfaceConfig, TimingParams, Visibility,
};
use stealth_storage_sqlite::{keys, Database, MemoryStore, SessionStore, SqliteStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const TRIGGER: &str = "masthead-date";
const TICK: Duration = Duration::from_millis(1);

fn fast_kdf() -> PinKdfParams {
    PinKdfParams {
        memory_kib: 1024,
        iterations: 1,
        lanes: 1,
    }
}

struct Fixture<S> {
    controller: StealthController<S, MockHost>,
    host: MockHost,
    store: Arc<S>,
    start: Instant,
}

impl<S: SessionStore + Sync> Fixture<S> {
    fn load(store: Arc<S>, surface: ProtectedSurface, timing: TimingParams) -> Self {
        let host = MockHost::new();
        let start = Instant::now();
        let controller = StealthController::load(
            &SurfaceConfig::new(surface),
            timing,
            fast_kdf(),
            Arc::clone(&store),
            host.clone(),
            start,
        );
        Self {
            controller,
            host,
            store,
            start,
        }
    }

    fn at(&self, ms: u64) -> Instant {
        self.start + Duration::from_millis(ms)
    }

    fn double_activate(&mut self, element: &str, ms: u64) {
        let first = self.at(ms);
        self.controller.on_trigger_activation(element, first);
        self.controller
            .on_trigger_activation(element, first + Duration::from_millis(250));
    }

    fn type_code(&mut self, code: &str, ms: u64) {
        let now = self.at(ms);
        for byte in code.bytes() {
            self.controller.on_digit(byte - b'0', now);
        }
    }

    fn unlock(&mut self, code: &str, ms: u64) {
        self.double_activate(TRIGGER, ms);
        self.type_code(code, ms + 1_000);
        assert_eq!(self.controller.mode(), Mode::Protected);
    }
}

fn memory_fixture() -> Fixture<MemoryStore> {
    Fixture::load(
        Arc::new(MemoryStore::new()),
        ProtectedSurface::Vault,
        TimingParams::default(),
    )
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn scenario_a_fresh_session_is_disguised() {
    let fixture = memory_fixture();

    assert_eq!(fixture.controller.mode(), Mode::Decoy);
    assert!(!fixture.controller.is_configured());
    assert_eq!(fixture.controller.session().decoy_title, "Daily Brief");
}

#[test]
fn scenario_b_first_passcode_unlocks() {
    let mut fixture = memory_fixture();

    fixture.double_activate(TRIGGER, 0);
    assert_eq!(fixture.controller.mode(), Mode::AwaitingPasscode);
    assert!(fixture
        .host
        .calls()
        .contains(&HostCall::ShowPasscodeEntry(PasscodeFlow::Setup)));

    fixture.type_code("1234", 2_000);

    assert!(fixture.controller.is_configured());
    assert_eq!(fixture.controller.mode(), Mode::Protected);
    assert_eq!(
        fixture.store.get(keys::MODE).unwrap().as_deref(),
        Some("protected")
    );
    assert!(fixture
        .host
        .calls()
        .contains(&HostCall::MountProtected(ProtectedSurface::Vault, None)));
}

#[test]
fn scenario_c_hidden_tab_relocks_immediately() {
    let mut fixture = memory_fixture();
    fixture.unlock("1234", 0);

    let now = fixture.at(5_000);
    fixture.controller.on_visibility_change(Visibility::Hidden, now);

    assert_eq!(fixture.controller.mode(), Mode::Decoy);
    assert_eq!(fixture.controller.session().last_transition_at, now);
    assert_eq!(fixture.store.get(keys::MODE).unwrap().as_deref(), Some("decoy"));
    assert_eq!(fixture.controller.next_deadline(), None);
}

#[test]
fn scenario_d_short_blur_survives_long_blur_relocks() {
    let mut fixture = memory_fixture();
    fixture.unlock("1234", 0);

    fixture.controller.on_focus_change(false, fixture.at(10_000));
    fixture.controller.poll_timers(fixture.at(39_000));
    fixture.controller.on_focus_change(true, fixture.at(39_000));
    fixture.controller.poll_timers(fixture.at(80_000));
    assert_eq!(fixture.controller.mode(), Mode::Protected);

    fixture.controller.on_focus_change(false, fixture.at(100_000));
    fixture.controller.poll_timers(fixture.at(131_000));
    assert_eq!(fixture.controller.mode(), Mode::Decoy);
}

#[test]
fn scenario_e_notification_is_camouflaged() {
    let mut fixture = memory_fixture();
    let sender = "Valentina Okafor";
    let body = "The lawyer has the deed, meet Thursday";

    let routing = fixture
        .controller
        .on_sensitive_event(SensitiveEvent::new("msg-41", sender, body), fixture.at(0));
    let EventRouting::Camouflaged(id) = routing else {
        panic!("event delivered while disguised");
    };

    let pending = fixture.controller.displayed_notification().unwrap();
    assert_eq!(pending.id(), id);
    assert!(!contains_fragment_of(pending.decoy_text(), sender));
    assert!(!contains_fragment_of(pending.decoy_text(), body));
    for text in fixture.host.rendered_text() {
        assert!(!contains_fragment_of(&text, sender), "{}", text);
        assert!(!contains_fragment_of(&text, body), "{}", text);
    }

    assert!(fixture.controller.on_notification_activated(id, fixture.at(1_000)));
    assert_eq!(fixture.controller.mode(), Mode::AwaitingPasscode);
    assert!(!fixture
        .host
        .calls()
        .iter()
        .any(|call| matches!(call, HostCall::MountProtected(..))));
}

// ============================================================================
// Invariants and edge cases
// ============================================================================

#[test]
fn test_blur_boundary() {
    let grace = TimingParams::default().blur_grace;

    let mut fixture = memory_fixture();
    fixture.unlock("1234", 0);
    let blur_at = fixture.at(5_000);
    fixture.controller.on_focus_change(false, blur_at);

    fixture.controller.poll_timers(blur_at + grace - TICK);
    assert_eq!(fixture.controller.mode(), Mode::Protected);

    fixture.controller.poll_timers(blur_at + grace + TICK);
    assert_eq!(fixture.controller.mode(), Mode::Decoy);
}

#[test]
fn test_hidden_while_decoy_is_noop() {
    let mut fixture = memory_fixture();
    let writes = fixture.store.write_count();
    let calls = fixture.host.calls();

    for ms in [0, 10, 20] {
        fixture
            .controller
            .on_visibility_change(Visibility::Hidden, fixture.at(ms));
    }

    assert_eq!(fixture.store.write_count(), writes);
    assert_eq!(fixture.host.calls(), calls);
    assert_eq!(fixture.controller.mode(), Mode::Decoy);
}

#[test]
fn test_repeated_relock_signals_write_once() {
    let mut fixture = memory_fixture();
    fixture.unlock("1234", 0);

    let writes = fixture.store.write_count();
    fixture
        .controller
        .on_visibility_change(Visibility::Hidden, fixture.at(3_000));
    let after_first = fixture.store.write_count();
    assert!(after_first > writes);

    fixture
        .controller
        .on_visibility_change(Visibility::Hidden, fixture.at(3_001));
    fixture.controller.on_page_unload(fixture.at(3_002));
    assert_eq!(fixture.store.write_count(), after_first);
}

#[test]
fn test_hidden_beats_pending_blur() {
    let mut fixture = memory_fixture();
    fixture.unlock("1234", 0);

    fixture.controller.on_focus_change(false, fixture.at(2_000));
    assert!(fixture.controller.next_deadline().is_some());

    fixture
        .controller
        .on_visibility_change(Visibility::Hidden, fixture.at(2_500));
    assert_eq!(fixture.controller.mode(), Mode::Decoy);
    assert_eq!(fixture.controller.next_deadline(), None);
}

#[test]
fn test_single_activations_never_request_passcode() {
    let mut fixture = memory_fixture();
    for i in 0..20 {
        fixture
            .controller
            .on_trigger_activation(TRIGGER, fixture.at(i * 700));
        assert_eq!(fixture.controller.mode(), Mode::Decoy);
    }
}

#[test]
fn test_wrong_and_malformed_passcodes_look_alike() {
    let mut fixture = memory_fixture();
    fixture.unlock("1234", 0);
    fixture.controller.return_to_decoy(fixture.at(1_500));

    let mut outcomes = Vec::new();
    for (i, candidate) in ["9999", "12a4"].into_iter().enumerate() {
        let ms = 10_000 * (i as u64 + 1);
        fixture.double_activate(TRIGGER, ms);
        fixture.host.clear();
        let opened = fixture.controller.submit_passcode(candidate, fixture.at(ms + 1_000));
        outcomes.push((opened, fixture.host.calls(), fixture.controller.mode()));
    }

    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[0].2, Mode::Decoy);
    assert_eq!(
        outcomes[0].1,
        vec![HostCall::PasscodeRejected, HostCall::HidePasscodeEntry]
    );
}

#[test]
fn test_protected_only_after_successful_check() {
    let mut fixture = memory_fixture();
    fixture.unlock("2580", 0);
    fixture.controller.return_to_decoy(fixture.at(2_000));

    // Every entry point except a correct passcode leaves the surface closed.
    let now = fixture.at(3_000);
    assert!(!fixture.controller.submit_passcode("2580", now));
    fixture.controller.on_digit(2, now);
    fixture.controller.on_focus_change(true, now);
    fixture.controller.poll_timers(now + Duration::from_secs(3600));
    fixture.controller.report_protected_failure(now);
    assert_eq!(fixture.controller.mode(), Mode::Decoy);

    fixture.double_activate(TRIGGER, 4_000);
    fixture.type_code("0852", 5_000);
    assert_eq!(fixture.controller.mode(), Mode::Decoy);

    fixture.double_activate(TRIGGER, 6_000);
    fixture.type_code("2580", 7_000);
    assert_eq!(fixture.controller.mode(), Mode::Protected);
}

#[test]
fn test_cancel_and_hidden_dismiss_overlay() {
    let mut fixture = memory_fixture();

    fixture.double_activate(TRIGGER, 0);
    fixture.type_code("12", 500);
    fixture.controller.cancel_passcode(fixture.at(1_000));
    assert_eq!(fixture.controller.mode(), Mode::Decoy);
    assert_eq!(fixture.controller.entered_digits(), 0);

    let writes = fixture.store.write_count();
    fixture.double_activate(TRIGGER, 2_000);
    fixture
        .controller
        .on_visibility_change(Visibility::Hidden, fixture.at(3_000));
    assert_eq!(fixture.controller.mode(), Mode::Decoy);
    assert_eq!(fixture.store.write_count(), writes);
}

#[test]
fn test_render_failure_relocks_silently() {
    let mut fixture = memory_fixture();
    fixture.unlock("1234", 0);
    fixture.host.clear();

    fixture.controller.report_protected_failure(fixture.at(4_000));

    assert_eq!(fixture.controller.mode(), Mode::Decoy);
    assert_eq!(
        fixture.host.calls(),
        vec![
            HostCall::UnmountProtected,
            HostCall::SetTitle("Daily Brief".to_string()),
            HostCall::ShowDecoy(stealth_core::DecoyIdentity::NewsReader),
        ]
    );
}

#[test]
fn test_unload_leaves_decoy_in_storage() {
    let store = Arc::new(MemoryStore::new());
    let mut fixture = Fixture::load(
        Arc::clone(&store),
        ProtectedSurface::Vault,
        TimingParams::default(),
    );
    fixture.unlock("1234", 0);
    fixture.controller.on_page_unload(fixture.at(2_000));

    assert_eq!(store.get(keys::MODE).unwrap().as_deref(), Some("decoy"));
}

#[test]
fn test_stored_protected_is_downgraded() {
    let store = Arc::new(MemoryStore::new());
    store.set(keys::MODE, "protected").unwrap();

    let fixture = Fixture::load(
        Arc::clone(&store),
        ProtectedSurface::Vault,
        TimingParams::default(),
    );

    assert_eq!(fixture.controller.mode(), Mode::Decoy);
    assert_eq!(store.get(keys::MODE).unwrap().as_deref(), Some("decoy"));
}

#[test]
fn test_unreadable_storage_fails_closed() {
    let store = Arc::new(MemoryStore::new());
    store.set_reads_fail(true);
    store.set_writes_fail(true);

    let mut fixture = Fixture::load(
        Arc::clone(&store),
        ProtectedSurface::Vault,
        TimingParams::default(),
    );
    assert_eq!(fixture.controller.mode(), Mode::Decoy);

    fixture.double_activate(TRIGGER, 0);
    assert!(fixture
        .host
        .calls()
        .contains(&HostCall::ShowPasscodeEntry(PasscodeFlow::Verify)));

    fixture.type_code("1234", 1_000);
    assert_eq!(fixture.controller.mode(), Mode::Decoy);
}

#[test]
fn test_failed_setup_write_does_not_unlock() {
    let store = Arc::new(MemoryStore::new());
    let mut fixture = Fixture::load(
        Arc::clone(&store),
        ProtectedSurface::Vault,
        TimingParams::default(),
    );
    store.set_writes_fail(true);

    fixture.double_activate(TRIGGER, 0);
    fixture.type_code("1234", 1_000);

    assert_eq!(fixture.controller.mode(), Mode::Decoy);
    assert!(!fixture.controller.is_configured());
}

#[test]
fn test_idle_relock() {
    let timing = TimingParams {
        idle_relock_after: Some(Duration::from_secs(60)),
        ..TimingParams::default()
    };
    let mut fixture = Fixture::load(Arc::new(MemoryStore::new()), ProtectedSurface::Vault, timing);
    fixture.unlock("1234", 0);

    fixture.controller.on_user_activity(fixture.at(50_000));
    fixture.controller.poll_timers(fixture.at(100_000));
    assert_eq!(fixture.controller.mode(), Mode::Protected);

    fixture.controller.poll_timers(fixture.at(110_000));
    assert_eq!(fixture.controller.mode(), Mode::Decoy);
}

#[test]
fn test_notifications_queue_oldest_first() {
    let mut fixture = memory_fixture();
    let display = TimingParams::default().notification_display;

    let first = fixture
        .controller
        .on_sensitive_event(SensitiveEvent::new("m1", "Ana", "first message"), fixture.at(0));
    let second = fixture
        .controller
        .on_sensitive_event(SensitiveEvent::new("m2", "Ben", "second message"), fixture.at(2_000));
    let (EventRouting::Camouflaged(first), EventRouting::Camouflaged(second)) = (first, second)
    else {
        panic!("events delivered while disguised");
    };

    assert_eq!(fixture.controller.pending_notifications(), 2);
    assert_eq!(fixture.controller.displayed_notification().unwrap().id(), first);

    fixture.controller.poll_timers(fixture.at(0) + display);
    assert_eq!(fixture.controller.displayed_notification().unwrap().id(), second);

    fixture.controller.poll_timers(fixture.at(2_000) + display);
    assert_eq!(fixture.controller.pending_notifications(), 0);

    // An expired notification can no longer be acted on.
    assert!(!fixture
        .controller
        .on_notification_activated(first, fixture.at(20_000)));
    assert_eq!(fixture.controller.mode(), Mode::Decoy);

    let calls = fixture.host.calls();
    assert!(calls.contains(&HostCall::HideNotification(first)));
    assert!(calls.contains(&HostCall::HideNotification(second)));
}

#[test]
fn test_unlock_clears_pending_notifications() {
    let mut fixture = memory_fixture();
    fixture
        .controller
        .on_sensitive_event(SensitiveEvent::new("m1", "Ana", "hello"), fixture.at(0));

    fixture.unlock("1234", 100);
    assert_eq!(fixture.controller.pending_notifications(), 0);
    assert!(fixture.controller.next_deadline().is_none());
}

#[test]
fn test_messaging_surface_uses_notes_cover() {
    let mut fixture = Fixture::load(
        Arc::new(MemoryStore::new()),
        ProtectedSurface::Messaging,
        TimingParams::default(),
    );

    assert_eq!(fixture.controller.session().decoy_title, "Notes");
    fixture.double_activate(TRIGGER, 0);
    assert_eq!(fixture.controller.mode(), Mode::Decoy);

    fixture.double_activate("notes-header", 1_000);
    assert_eq!(fixture.controller.mode(), Mode::AwaitingPasscode);
}

#[test]
fn test_lock_reason_names() {
    assert_eq!(LockReason::TabHidden.to_string(), "tab_hidden");
    assert_eq!(LockReason::BlurTimeout.as_str(), "blur_timeout");
}

// ============================================================================
// SQLite persistence
// ============================================================================

fn sqlite_stores(path: &std::path::Path) -> (Arc<SqliteStore>, Arc<SqliteStore>) {
    let db = Arc::new(Mutex::new(Database::open(path).unwrap()));
    (
        Arc::new(SqliteStore::new(Arc::clone(&db), ProtectedSurface::Vault.as_str()).unwrap()),
        Arc::new(SqliteStore::new(db, ProtectedSurface::Messaging.as_str()).unwrap()),
    )
}

#[test]
fn test_sqlite_reload_keeps_passcode_and_disguise() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stealth.db");

    {
        let (vault, _) = sqlite_stores(&path);
        let mut fixture = Fixture::load(vault, ProtectedSurface::Vault, TimingParams::default());
        fixture.unlock("4711", 0);
        // Dropped without unloading, as after a crash.
    }

    let (vault, messaging) = sqlite_stores(&path);
    assert_eq!(vault.get(keys::MODE).unwrap().as_deref(), Some("protected"));

    let mut fixture = Fixture::load(
        Arc::clone(&vault),
        ProtectedSurface::Vault,
        TimingParams::default(),
    );
    assert_eq!(fixture.controller.mode(), Mode::Decoy);
    assert!(fixture.controller.is_configured());
    assert_eq!(vault.get(keys::MODE).unwrap().as_deref(), Some("decoy"));

    fixture.unlock("4711", 5_000);

    let other = Fixture::load(messaging, ProtectedSurface::Messaging, TimingParams::default());
    assert!(!other.controller.is_configured());
}
