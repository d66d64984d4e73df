//! SRS viewer — entry point.
//!
//! ```text
//! srs-viewer                      Connect with defaults
//! srs-viewer --server host:port   Override the stream server
//! srs-viewer --config <path>      Use custom config TOML
//! srs-viewer --gen-config         Dump default config and exit
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use srs_core::{ConnectionManager, StreamEndpoint, WebSocketTransport};
use srs_viewer::app::ViewerApp;
use srs_viewer::config::ViewerConfig;
use srs_viewer::surface::{TerminalSurface, create_picker};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "srs-viewer", about = "SRS screen-region stream viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "srs-viewer.toml")]
    config: PathBuf,

    /// Stream server address (overrides config). Example: 192.168.1.50:8765
    #[arg(short, long)]
    server: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(server) = cli.server {
        let endpoint = StreamEndpoint::parse(&server)?;
        config.network.host = endpoint.host().to_string();
        config.network.port = endpoint.port();
    }

    init_tracing(&config);
    info!("srs-viewer v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Session wiring ───────────────────────────────────────

    let (manager, inbound_rx, _state_rx) = ConnectionManager::with_retry_delay(
        Arc::new(WebSocketTransport),
        config.endpoint(),
        Duration::from_millis(config.network.reconnect_delay_ms),
    );

    // The session starts connecting right away; a failure recovers
    // through the scheduled retry like any later drop.
    let startup = manager.clone();
    tokio::spawn(async move {
        if let Err(e) = startup.connect().await {
            warn!("initial connect: {e}");
        }
    });

    // Query terminal capabilities BEFORE raw mode.
    let graphics = config.display.graphics.clone();
    let picker = create_picker((!graphics.is_empty()).then_some(graphics.as_str()));
    let surface = TerminalSurface::new(picker);

    // ── 2. Terminal setup ───────────────────────────────────────

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // ── 3. Run ──────────────────────────────────────────────────

    let mut app = ViewerApp::new(manager.clone(), inbound_rx, surface, &config);
    let result = app.run(&mut terminal).await;

    // ── 4. Restore ──────────────────────────────────────────────

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    manager.disconnect();
    result
}

fn init_tracing(config: &ViewerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return;
    }
    match std::fs::File::create(&config.logging.file) {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        Err(e) => {
            eprintln!("cannot open log file {}: {e}", config.logging.file);
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
