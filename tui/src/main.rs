//! Maestro TUI Entry Point
//!
//! Usage:
//!   maestro-tui [OPTIONS]
//!
//! Options:
//!   -u, --url <URL>          Workflow server URL (default: http://localhost:8000)
//!   -c, --config <FILE>      Config file (default: ~/.config/maestro/client.toml)
//!       --log-file <PATH>    Log file (default: ~/.cache/maestro/tui.log)
//!       --health-poll <SECS> Re-probe backend health periodically
//!
//! Logging honours `RUST_LOG` (e.g. `RUST_LOG=maestro_client_core=debug`).

use std::io::{self, IsTerminal};
use std::panic;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use maestro_client_core::HttpTransport;
use maestro_tui::{App, Args};

/// Log to `path`
///
/// Writing to stderr would draw over the alternate screen, so without a
/// path logging stays off.
fn init_logging(path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("maestro_tui=info,maestro_client_core=info"));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {parent:?}"))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {path:?}"))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .with(filter)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.log_path().as_deref())?;

    let config = args.load_config().context("Failed to load configuration")?;
    tracing::info!(
        url = %config.backend_url,
        source = %config.source,
        "Using workflow server"
    );

    // Check if we have a TTY before attempting initialization
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        anyhow::bail!("maestro-tui requires a terminal (TTY); stdin or stdout is redirected");
    }

    let transport = Arc::new(HttpTransport::from_config(&config)?);
    let mut app = App::new(transport, &config);

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Run the app
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
