//! KPI-tter TUI - a terminal client for the KPI-tter micro-blog.
//!
//! Log in, read the global feed, open posts and profiles, like and unlike,
//! and publish short posts without leaving the keyboard.

mod app;
mod ui;
mod utils;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kpitter_core::{Config, Session};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE: &str = "kpitter.log";

const USAGE: &str = "\
Usage: kpitter [COMMAND]

Commands:
  --login     Log in from the terminal and store the credentials
  --logout    Forget the stored credentials
  --whoami    Print the logged-in user's profile as JSON
  --help      Show this message

With no command, starts the interactive client.";

/// Initialize the tracing subscriber for logging.
///
/// The terminal belongs to the UI, so logs go to a file in the cache
/// directory. Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = Config::cache_dir().ok()?;
    std::fs::create_dir_all(&log_dir).ok()?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        log_dir, LOG_FILE,
    ));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Some(guard)
}

fn open_session(config: &Config) -> Result<Session> {
    let storage = config.credential_storage()?;
    Session::from_config(config, storage).context("Failed to set up the API client")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_tracing();

    let config = Config::load()?;
    info!(base_url = %config.base_url, "KPI-tter starting");
    let session = open_session(&config)?;

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--login") => return login_command(config, &session).await,
        Some("--logout") => return logout_command(&session),
        Some("--whoami") => return whoami_command(&session).await,
        Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            return Ok(());
        }
        Some(other) => {
            eprintln!("Unknown argument: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
        None => {}
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(config, session);
    app.start();

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        error!(error = %e, "TUI exited with error");
        eprintln!("Error: {}", e);
    }

    info!("KPI-tter shutting down");
    Ok(())
}

/// Prompt for a username and password, verify them, and store them
async fn login_command(mut config: Config, session: &Session) -> Result<()> {
    print!("Username");
    if let Some(ref last) = config.last_username {
        print!(" [{}]", last);
    }
    print!(": ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = match username.trim() {
        "" => config.last_username.clone().unwrap_or_default(),
        name => name.to_string(),
    };

    let password = rpassword::prompt_password("Password: ")?;

    match session.login(&username, &password).await {
        Ok(()) => {
            config.last_username = Some(username.clone());
            config.save()?;
            println!("Logged in as @{}", username);
            Ok(())
        }
        Err(e) => {
            eprintln!("Login failed: {}", e.user_message());
            std::process::exit(1);
        }
    }
}

fn logout_command(session: &Session) -> Result<()> {
    match session.current_username() {
        Some(username) => {
            session.logout()?;
            println!("Logged out @{}", username);
        }
        None => println!("Not logged in"),
    }
    Ok(())
}

async fn whoami_command(session: &Session) -> Result<()> {
    match session.whoami().await {
        Ok(profile) => {
            println!("{}", serde_json::to_string_pretty(&profile)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Windows reports releases too
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                // Handle input
                if handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks();

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
