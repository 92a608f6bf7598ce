use std::fs::File;
use std::io::stdout;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use scream_hero::audio::{MicCapture, open_effects};
use scream_hero::collab::SystemClock;
use scream_hero::terminal::{KeyboardInput, TerminalGuard, TerminalRenderer};
use scream_hero::{App, EngineConfig, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SCREAM_HERO_LOG";
const FRAME: Duration = Duration::from_micros(16_667); // ~60 fps

/// Log to the file named by `SCREAM_HERO_LOG`, if any. The terminal itself
/// belongs to the game.
fn init_logging() {
    let Some(path) = std::env::var_os(LOG_ENV) else {
        return;
    };
    let file = match File::create(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("cannot open log file {}: {err}", path.to_string_lossy());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}

fn run() -> Result<()> {
    let config = EngineConfig::from_env()?;
    info!(preset = ?config.preset, threshold = config.threshold, "starting");

    let mic = MicCapture::new(config.window_len);
    let effects = open_effects();

    let mut out = stdout();
    let _guard = TerminalGuard::enter(&mut out)?;
    let mut app = App::with_config(
        config,
        KeyboardInput,
        mic,
        TerminalRenderer::new(out),
        SystemClock::new(),
        effects,
    );
    app.run(FRAME)?;
    info!(best = app.session().best(), "bye");
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "fatal");
            eprintln!("scream-hero: {err}");
            ExitCode::FAILURE
        }
    }
}
