use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::config::ConfigService;
use crate::engine::LauncherEngine;
use crate::engine::models::server_state_label;
use crate::engine::state::{ActionOutcome, LauncherEvent, OperationState};
use crate::process::ProcessLauncher;
use crate::verify::VerifyOptions;

mod config;
mod download;
mod engine;
mod env;
mod networking;
mod process;
mod status;
#[cfg(test)]
mod test_support;
mod util;
mod verify;

#[derive(Parser, Debug)]
#[command(
    name = "Crystal Launcher",
    author,
    version,
    about = "Game client launcher: verifies, downloads and starts the Crystal Shards client"
)]
struct Cli {
    /// Launcher home holding Config/ and the default Client/ directory.
    #[arg(long)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show launcher details, server status, news and patch notes.
    Info,
    /// Check the installed client against the asset manifest.
    Verify {
        /// Also compare file sizes and SHA-256 hashes listed in the manifest.
        #[arg(long)]
        deep: bool,
        /// Pause between manifest entries, in milliseconds.
        #[arg(long, default_value_t = 5)]
        entry_delay_ms: u64,
    },
    /// Download the configured client package into the client directory.
    Download,
    /// Start the game client.
    Play,
    /// Open the launcher configuration file.
    Settings,
    /// Open the official website.
    Site,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let base = cli.home.unwrap_or_else(env::base_dir);
    let service = ConfigService::new(env::config_path(&base), env::template_path(&base));

    let config = match service.load().await {
        Ok(config) => config,
        Err(err) => {
            error!("startup: failed to load launcher configuration: {err}");
            eprintln!("Failed to load launcher settings: {err}");
            std::process::exit(1);
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(render_events(rx));

    let command = cli.command.unwrap_or(Command::Info);
    let verify_options = match &command {
        Command::Verify {
            deep,
            entry_delay_ms,
        } => VerifyOptions {
            entry_delay: Duration::from_millis(*entry_delay_ms),
            deep: *deep,
        },
        _ => VerifyOptions::default(),
    };

    let engine = LauncherEngine::new(
        config,
        service.config_path().to_path_buf(),
        &base,
        Arc::new(ProcessLauncher::new()),
        tx,
    )
    .with_verify_options(verify_options);
    let mut refreshes = engine.start_background_refresh();

    if matches!(command, Command::Info) {
        for handle in refreshes.drain(..) {
            let _ = handle.await;
        }
    }
    let outcome = run_command(&engine, command).await;
    // One-shot actions do not wait for the display refreshes.
    for handle in refreshes {
        handle.abort();
        let _ = handle.await;
    }

    if outcome == ActionOutcome::Rejected {
        warn!("action rejected: another operation is in progress");
    }

    drop(engine);
    let _ = renderer.await;
}

async fn run_command(engine: &LauncherEngine, command: Command) -> ActionOutcome {
    match command {
        Command::Info => {
            print_info(engine);
            ActionOutcome::Completed
        }
        Command::Verify { .. } => engine.verify().await,
        Command::Download => engine.download().await,
        Command::Play => engine.play(),
        Command::Settings => engine.open_settings(),
        Command::Site => engine.open_site(),
    }
}

fn print_info(engine: &LauncherEngine) {
    let snapshot = engine.snapshot();
    println!("{} | {}", engine.game_title(), engine.build_version());
    println!("{}", engine.tagline());
    println!();
    println!("Server:           {}", server_state_label(Some(snapshot.server_state)));
    println!("Client directory: {}", engine.client_dir().display());
    println!("Asset manifest:   {}", engine.manifest_path().display());
    println!(
        "Game executable:  {}",
        if snapshot.executable_available {
            "found"
        } else {
            "not found"
        }
    );
    println!(
        "Download:         {}",
        if engine.is_download_enabled() {
            "available"
        } else {
            "not configured"
        }
    );

    println!();
    println!("News");
    for entry in &snapshot.news {
        println!("  [{}] {} ({})", entry.tag, entry.title, entry.published_at);
        if !entry.subtitle.is_empty() {
            println!("      {}", entry.subtitle);
        }
    }

    println!();
    println!("Patch notes");
    for note in &snapshot.patch_notes {
        println!("  {}: {}", note.version, note.summary);
    }
}

async fn render_events(mut rx: mpsc::UnboundedReceiver<LauncherEvent>) {
    let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = rx.recv().await {
        match event {
            LauncherEvent::OperationChanged(OperationState::Busy(operation)) => {
                debug!("render: {operation:?} started");
                let progress = ProgressBar::new(100);
                progress.set_style(style.clone());
                bar = Some(progress);
            }
            LauncherEvent::OperationChanged(OperationState::Idle) => {
                if let Some(progress) = bar.take() {
                    let last_status = progress.message();
                    progress.finish_and_clear();
                    if !last_status.is_empty() {
                        println!("{last_status}");
                    }
                }
            }
            LauncherEvent::Progress(pct) => {
                if let Some(progress) = &bar {
                    progress.set_position(pct.round() as u64);
                }
            }
            LauncherEvent::Status(status) => match &bar {
                Some(progress) => progress.set_message(status),
                None => println!("{status}"),
            },
            LauncherEvent::ServerStateChanged(state) => {
                info!("server status: {}", server_state_label(Some(state)));
            }
            LauncherEvent::ExecutableAvailability(available) => {
                debug!("render: game executable available={available}");
            }
            LauncherEvent::NewsReplaced(news) => {
                debug!("render: {} news entries", news.len());
            }
            LauncherEvent::PatchNotesReplaced(notes) => {
                debug!("render: {} patch notes", notes.len());
            }
        }
    }
}
