//! CLI harness for the stealth access controller
//!
//! This tool allows testing:
//! - Unlock and re-lock flows against a real SQLite state file
//! - Blur and idle grace periods on a simulated clock
//! - Notification camouflage output
//! - Live timers through the async driver

mod console;
mod script;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::ConsoleHost;
use directories::ProjectDirs;
use parking_lot::Mutex;
use script::{parse_line, Command};
use stealth_core::driver::{self, DriverHandle};
use stealth_core::{HostEvent, SensitiveEvent, StealthController, Visibility};
use stealth_params::{ProtectedSurface, StealthConfig, SurfaceConfig};
use stealth_storage_sqlite::{keys, Database, SessionStore, SqliteStore};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Gap between the two activations of `dblclick`
const DOUBLE_CLICK_GAP: Duration = Duration::from_millis(150);

#[derive(Parser)]
#[command(name = "stealth-harness")]
#[command(about = "Stealth access controller harness", long_about = None)]
struct Cli {
    /// JSON config file (defaults apply when absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite state file
    #[arg(short, long, global = true)]
    db: Option<PathBuf>,

    /// Protected surface to drive
    #[arg(short, long, global = true, default_value = "vault")]
    surface: ProtectedSurface,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a script on a simulated clock
    Run {
        /// Script file, stdin when omitted
        script: Option<PathBuf>,
    },

    /// Read commands from stdin and run them with real timers
    Live,

    /// Print the persisted state of the surface
    Show,

    /// Print cover content for the surface's decoy
    Feed {
        /// Number of lines
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,
    },
}

type Controller = StealthController<SqliteStore, ConsoleHost>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StealthConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StealthConfig::default(),
    };
    let surface = config
        .surface(cli.surface)
        .cloned()
        .with_context(|| format!("surface {} is not configured", cli.surface))?;

    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path()?,
    };
    info!("State file: {}", db_path.display());

    let db = Arc::new(Mutex::new(Database::open(&db_path)?));
    let store = Arc::new(SqliteStore::new(db, surface.surface.as_str())?);

    match cli.command {
        Commands::Run { script } => run_script(&config, &surface, store, script)?,
        Commands::Live => run_live(&config, &surface, store).await?,
        Commands::Show => show_state(&surface, store.as_ref())?,
        Commands::Feed { count } => {
            let controller = load(&config, &surface, store, Instant::now());
            for line in controller.decoy_feed(count) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = ProjectDirs::from("com", "StealthAccess", "StealthHarness")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&base)?;
    Ok(base.join("stealth_state.db"))
}

fn load(
    config: &StealthConfig,
    surface: &SurfaceConfig,
    store: Arc<SqliteStore>,
    now: Instant,
) -> Controller {
    StealthController::load(
        surface,
        config.timing(),
        config.pin_kdf,
        store,
        ConsoleHost::new(),
        now,
    )
}

fn read_lines(script: Option<PathBuf>) -> anyhow::Result<Vec<String>> {
    let lines = match script {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading script {}", path.display()))?
            .lines()
            .map(str::to_string)
            .collect(),
        None => std::io::stdin().lock().lines().collect::<Result<_, _>>()?,
    };
    Ok(lines)
}

fn run_script(
    config: &StealthConfig,
    surface: &SurfaceConfig,
    store: Arc<SqliteStore>,
    script: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut clock = Instant::now();
    let start = clock;
    let mut controller = load(config, surface, store, clock);

    for (number, line) in read_lines(script)?.iter().enumerate() {
        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!("line {}: {}", number + 1, e);
                continue;
            }
        };
        println!("> {}", line.trim());
        apply(&mut controller, command, &mut clock);
    }

    println!(
        "mode {} after {:.1}s simulated",
        controller.mode(),
        clock.duration_since(start).as_secs_f64()
    );
    controller.on_page_unload(clock);
    Ok(())
}

fn apply(controller: &mut Controller, command: Command, clock: &mut Instant) {
    let now = *clock;
    match command {
        Command::Click(element) => controller.on_trigger_activation(&element, now),
        Command::DoubleClick(element) => {
            controller.on_trigger_activation(&element, now);
            *clock += DOUBLE_CLICK_GAP;
            controller.on_trigger_activation(&element, *clock);
        }
        Command::Type(digits) => {
            for byte in digits.bytes() {
                controller.on_digit(byte - b'0', now);
            }
        }
        Command::Backspace => controller.on_backspace(),
        Command::Submit(code) => {
            controller.submit_passcode(&code, now);
        }
        Command::Cancel => controller.cancel_passcode(now),
        Command::Hide => controller.on_visibility_change(Visibility::Hidden, now),
        Command::Show => controller.on_visibility_change(Visibility::Visible, now),
        Command::Blur => controller.on_focus_change(false, now),
        Command::Focus => controller.on_focus_change(true, now),
        Command::Activity => controller.on_user_activity(now),
        Command::Unload => controller.on_page_unload(now),
        Command::Event { id, sender, body } => {
            controller.on_sensitive_event(SensitiveEvent::new(id, sender, body), now);
        }
        Command::Open => match controller.host().displayed() {
            Some(id) => {
                controller.on_notification_activated(id, now);
            }
            None => println!("(no notification on display)"),
        },
        Command::Wait(ms) => {
            let target = now + Duration::from_millis(ms);
            advance(controller, target);
            *clock = target;
        }
        Command::Lock => controller.return_to_decoy(now),
        Command::Crash => controller.report_protected_failure(now),
        Command::Change { current, new } => match controller.change_passcode(&current, &new) {
            Ok(()) => println!("(passcode changed)"),
            Err(e) => println!("(change refused: {})", e),
        },
        Command::Status => {
            let session = controller.session();
            println!(
                "(mode {}, cover {:?}, configured {}, {} notification(s) queued)",
                session.mode,
                session.decoy_title,
                controller.is_configured(),
                controller.pending_notifications()
            );
        }
    }
}

/// Fire every deadline up to `target` in order
fn advance(controller: &mut Controller, target: Instant) {
    while let Some(deadline) = controller.next_deadline() {
        if deadline > target {
            break;
        }
        controller.poll_timers(deadline);
        if controller.next_deadline() == Some(deadline) {
            break;
        }
    }
    controller.poll_timers(target);
}

async fn run_live(
    config: &StealthConfig,
    surface: &SurfaceConfig,
    store: Arc<SqliteStore>,
) -> anyhow::Result<()> {
    let controller = load(config, surface, store, Instant::now());
    let notifications = controller.host().clone();
    let (handle, task) = driver::spawn(controller);

    let (lines_tx, mut lines_rx) = tokio::sync::mpsc::channel::<String>(16);
    // Stdin is blocking; read it off the runtime.
    tokio::task::spawn_blocking(move || {
        for line in std::io::stdin().lock().lines().map_while(Result::ok) {
            if lines_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    while let Some(line) = lines_rx.recv().await {
        match parse_line(&line) {
            Ok(Some(command)) => forward(&handle, &notifications, command).await?,
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
    }

    handle.shutdown().await?;
    let controller = task.await?;
    println!("mode {} at exit", controller.mode());
    Ok(())
}

async fn forward(
    handle: &DriverHandle,
    host: &ConsoleHost,
    command: Command,
) -> anyhow::Result<()> {
    let events = match command {
        Command::Click(element) => vec![HostEvent::Activation(element)],
        Command::DoubleClick(element) => vec![
            HostEvent::Activation(element.clone()),
            HostEvent::Activation(element),
        ],
        Command::Type(digits) | Command::Submit(digits) => {
            // Non-digits map past 9 and are ignored by the overlay.
            digits
                .bytes()
                .map(|b| HostEvent::Digit(b.wrapping_sub(b'0')))
                .collect()
        }
        Command::Backspace => vec![HostEvent::Backspace],
        Command::Cancel => vec![HostEvent::CancelPasscode],
        Command::Hide => vec![HostEvent::Visibility(Visibility::Hidden)],
        Command::Show => vec![HostEvent::Visibility(Visibility::Visible)],
        Command::Blur => vec![HostEvent::Focus(false)],
        Command::Focus => vec![HostEvent::Focus(true)],
        Command::Activity => vec![HostEvent::Activity],
        Command::Unload => vec![HostEvent::Unload],
        Command::Event { id, sender, body } => {
            vec![HostEvent::Sensitive(SensitiveEvent::new(id, sender, body))]
        }
        Command::Open => match host.displayed() {
            Some(id) => vec![HostEvent::NotificationActivated(id)],
            None => Vec::new(),
        },
        Command::Wait(ms) => {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Vec::new()
        }
        Command::Lock => vec![HostEvent::ReturnToDecoy],
        Command::Crash => vec![HostEvent::ProtectedFailure],
        Command::Status => {
            println!("(mode {})", handle.mode());
            Vec::new()
        }
        Command::Change { .. } => {
            warn!("change is only available in run mode");
            Vec::new()
        }
    };

    for event in events {
        handle.send(event).await?;
    }
    Ok(())
}

fn show_state(surface: &SurfaceConfig, store: &SqliteStore) -> anyhow::Result<()> {
    println!("surface {} (scope {})", surface.surface, store.scope());
    for key in [
        keys::MODE,
        keys::PASSCODE_CONFIGURED,
        keys::DECOY_TITLE,
        keys::LAST_TRANSITION_AT,
    ] {
        let value = store.get(key)?;
        println!("  {} = {}", key, value.as_deref().unwrap_or("-"));
    }
    let verifier = store.get(keys::PASSCODE_VERIFIER)?;
    println!(
        "  {} = {}",
        keys::PASSCODE_VERIFIER,
        if verifier.is_some() { "<set>" } else { "-" }
    );
    Ok(())
}
