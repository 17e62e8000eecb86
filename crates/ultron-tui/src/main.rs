use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use ultron_core::{Config, GeminiClient};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{Events, Screen, Tui};

#[derive(Parser)]
#[command(name = "ultron", version)]
#[command(about = "Chat with Ultron from the terminal, optionally with a PDF attached")]
struct Cli {
    /// Model to query (defaults to the configured model)
    #[arg(short, long)]
    model: Option<String>,
    /// Base URL of the generation endpoint
    #[arg(long, env = "ULTRON_ENDPOINT")]
    endpoint: Option<String>,
    /// PDF to attach when the chat opens
    #[arg(short, long)]
    attach: Option<PathBuf>,
    /// Remember the chosen model as the default
    #[arg(long)]
    save_model: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging()?;

    let mut config = Config::load().unwrap_or_else(|error| {
        warn!(%error, "could not load config, using defaults");
        Config::new()
    });
    if let Some(model) = cli.model {
        config.model = Some(model);
    }
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if cli.save_model {
        Config::save_default_model(&config.model())?;
    }

    let client = GeminiClient::from_config(&config);
    if !client.has_api_key() {
        warn!("no API key configured; replies will fall back to an error message");
    }
    info!(model = client.model(), "starting chat");

    let mut app = App::new(client);
    if let Some(path) = cli.attach {
        app.attach_path(&path);
    }

    tui::install_panic_hook();
    let mut screen = Screen::enter()?;
    run(&mut screen, &mut app).await
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = Events::spawn();
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;
        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

/// The terminal belongs to the UI, so logs go to a file in the config dir
fn init_logging() -> Result<WorkerGuard> {
    let log_dir = Config::config_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::never(&log_dir, "ultron.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
