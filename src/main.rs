//! lecture-lens - live lecture subtitles in the terminal
//!
//! # Usage
//!
//! ```bash
//! # Launch interactive TUI
//! lecture-lens --server http://lecture.local:5000
//!
//! # CLI mode (for automation)
//! lecture-lens languages --json
//! lecture-lens watch --language en --max 5
//! ```

use std::io::{stdout, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self as term_event, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use lecture_lens::app::App;
use lecture_lens::cli::{self, Cli, Command, ExitCode, Output};
use lecture_lens::commands;
use lecture_lens::config::Config;
use lecture_lens::event::{self, EventReceiver, EventSender};
use lecture_lens::net::{Connection, ConnectionConfig, Outbox};
use lecture_lens::preferences::Preferences;
use lecture_lens::speech::{
    DisabledSpeech, LocalSpeech, ProcessPlayer, ServerSpeech, SpeechBackend, SpeechKind,
};
use lecture_lens::ui;

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                return ExitCode::InvalidArgs.into();
            }
        },
        None => Config::load(),
    };

    if cli.is_cli_mode() {
        init_console_logging();
        return run_cli(cli, config).await.into();
    }

    init_file_logging();
    match run_tui(cli, config).await {
        Ok(()) => ExitCode::Success.into(),
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::Error.into()
        }
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Subcommands log to stderr; stdout carries their output
fn init_console_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

/// The TUI owns the terminal, so its log goes to <cache_dir>/lecture-lens/client.log
fn init_file_logging() {
    let Some(dir) = dirs::cache_dir().map(|d| d.join("lecture-lens")) else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let log_path = dir.join("client.log");
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    else {
        return;
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    log::info!("Logging to file: {}", log_path.display());
}

// =============================================================================
// CLI Mode
// =============================================================================

async fn run_cli(cli: Cli, config: Config) -> ExitCode {
    let output = Output::new(&cli);
    let server = config.resolve_server(cli.server.as_deref());

    match cli.command {
        Some(Command::Languages(cmd)) => commands::languages_cmd(cmd, &server, &output).await,

        Some(Command::Current(cmd)) => {
            if let Some(code) = &cmd.language {
                if let Err(e) = cli::validate_language_code(code) {
                    return output.error(e, ExitCode::InvalidArgs);
                }
            }
            commands::current_cmd(cmd, &server, &output).await
        }

        Some(Command::Watch(cmd)) => {
            if let Err(e) = cli::validate_language_code(&cmd.language) {
                return output.error(e, ExitCode::InvalidArgs);
            }
            commands::watch_cmd(cmd, &server, config.reconnect_delay(), &output).await
        }

        None => ExitCode::Success,
    }
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Pick the speech backend; a missing synthesizer or player disables speech
fn build_speech(
    kind: SpeechKind,
    config: &Config,
    outbox: Outbox,
    events: EventSender,
) -> Box<dyn SpeechBackend> {
    match kind {
        SpeechKind::Local => {
            let local = LocalSpeech::new(&config.synthesizer, events);
            if local.is_supported() {
                Box::new(local)
            } else {
                Box::new(DisabledSpeech::new(
                    kind,
                    format!("{} not found or has no voices", config.synthesizer),
                ))
            }
        }
        SpeechKind::Server => {
            if config.player.is_available() {
                Box::new(ServerSpeech::new(
                    outbox,
                    ProcessPlayer::new(config.player, events),
                ))
            } else {
                Box::new(DisabledSpeech::new(
                    kind,
                    format!("audio player '{}' not found", config.player),
                ))
            }
        }
    }
}

/// Initialize the terminal for TUI mode
fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_tui(cli: Cli, config: Config) -> Result<()> {
    if let Some(code) = &cli.language {
        cli::validate_language_code(code).map_err(anyhow::Error::msg)?;
    }

    let server = config.resolve_server(cli.server.as_deref());
    log::info!("Connecting to {}", server);

    let (tx, mut rx) = event::channel();
    let connection = Connection::spawn(
        ConnectionConfig {
            reconnect_delay: config.reconnect_delay(),
            ..ConnectionConfig::new(server.clone())
        },
        tx.clone(),
    )
    .with_context(|| format!("Cannot use server URL {}", server))?;

    let kind = cli.speech.unwrap_or(config.speech);
    let speech = build_speech(kind, &config, connection.outbox(), tx);

    let prefs_path = Preferences::path();
    let prefs = prefs_path
        .as_deref()
        .map(Preferences::load_from)
        .unwrap_or_default();

    let mut app = App::new(speech, prefs).with_preferred_language(cli.language);
    if let Some(path) = prefs_path {
        app = app.with_prefs_path(path);
    }
    if !app.speech().is_supported() {
        app.set_notice("Speech unavailable; see log for details");
    }

    let mut terminal = init_terminal().context("Failed to set up terminal")?;

    let result = run_event_loop(&mut terminal, &mut app, &mut rx).await;

    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;

    drop(app);
    connection.shutdown();
    result
}

/// Main event loop: render, read one key, then drain everything that arrived
/// from the channel and the speech backends
async fn run_event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventReceiver) -> Result<()> {
    const TICK_RATE: Duration = Duration::from_millis(50);

    while app.running {
        terminal.draw(|frame| ui::render(frame, app))?;

        if term_event::poll(TICK_RATE)? {
            if let Event::Key(key) = term_event::read()? {
                // Only handle key press events (ignore releases on Windows)
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        while let Ok(event) = events.try_recv() {
            app.handle_event(event);
        }
    }

    Ok(())
}
