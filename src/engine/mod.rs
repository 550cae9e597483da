use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::download::{self, DownloadError};
use crate::engine::models::{
    DEFAULT_BUILD_VERSION, DEFAULT_GAME_TITLE, DEFAULT_TAGLINE, LauncherConfig, NewsEntry,
    PatchNoteEntry, ServerState, default_news, default_patch_notes, non_blank,
};
use crate::engine::state::{
    ActionOutcome, LauncherEvent, Operation, OperationState, READY_STATUS, Session, SessionState,
};
use crate::env;
use crate::networking::NetworkClient;
use crate::process::{ExternalLauncher, resolve_game_executable};
use crate::status::{extract_server_state, parse_server_state};
use crate::verify::{self, VerifyOptions};

pub mod models;
pub mod state;

const DEFAULT_MANIFEST_FILE: &str = "assets.json";

/// Orchestrates verification, downloads and launching for one launcher session.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct LauncherEngine {
    config: Arc<LauncherConfig>,
    settings_path: PathBuf,
    client_dir: PathBuf,
    manifest_path: PathBuf,
    session: Session,
    network: NetworkClient,
    downloads: NetworkClient,
    launcher: Arc<dyn ExternalLauncher>,
    verify_options: VerifyOptions,
}

impl LauncherEngine {
    pub fn new(
        config: LauncherConfig,
        settings_path: PathBuf,
        base_dir: &Path,
        launcher: Arc<dyn ExternalLauncher>,
        updates: mpsc::UnboundedSender<LauncherEvent>,
    ) -> Self {
        let client_dir = non_blank(&config.client_directory)
            .map(|dir| env::resolve_against(base_dir, dir))
            .unwrap_or_else(|| env::default_client_dir(base_dir));
        let manifest_path = non_blank(&config.assets_manifest)
            .map(|manifest| env::resolve_against(&client_dir, manifest))
            .unwrap_or_else(|| client_dir.join(DEFAULT_MANIFEST_FILE));

        let server_state = config
            .default_server_state
            .as_deref()
            .and_then(parse_server_state)
            .unwrap_or(ServerState::Online);
        let news = config
            .news
            .clone()
            .filter(|news| !news.is_empty())
            .unwrap_or_else(default_news);
        let patch_notes = config
            .patch_notes
            .clone()
            .filter(|notes| !notes.is_empty())
            .unwrap_or_else(default_patch_notes);

        let session = Session::new(
            SessionState {
                progress: 0.0,
                status: READY_STATUS.into(),
                operation: OperationState::Idle,
                server_state,
                news,
                patch_notes,
                executable_available: false,
            },
            updates,
        );

        let engine = Self {
            config: Arc::new(config),
            settings_path,
            client_dir,
            manifest_path,
            session,
            network: NetworkClient::new(),
            downloads: NetworkClient::for_downloads(),
            launcher,
            verify_options: VerifyOptions::default(),
        };
        engine.refresh_executable_state();
        info!(
            "engine: client dir {}, manifest {}",
            engine.client_dir.display(),
            engine.manifest_path.display()
        );
        engine
    }

    pub fn with_verify_options(mut self, options: VerifyOptions) -> Self {
        self.verify_options = options;
        self
    }

    pub fn game_title(&self) -> &str {
        non_blank(&self.config.game_title).unwrap_or(DEFAULT_GAME_TITLE)
    }

    pub fn tagline(&self) -> &str {
        non_blank(&self.config.tagline).unwrap_or(DEFAULT_TAGLINE)
    }

    pub fn build_version(&self) -> &str {
        non_blank(&self.config.build_version).unwrap_or(DEFAULT_BUILD_VERSION)
    }

    pub fn client_dir(&self) -> &Path {
        &self.client_dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn is_download_enabled(&self) -> bool {
        non_blank(&self.config.download_package_url).is_some()
    }

    pub fn snapshot(&self) -> SessionState {
        self.session.snapshot()
    }

    /// Kick off the news, patch-notes and status refreshes as independent tasks.
    ///
    /// Must be called from within a Tokio runtime. None of them touches the
    /// busy flag.
    pub fn start_background_refresh(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        if let Some(feed) = non_blank(&self.config.news_feed).map(str::to_owned) {
            let engine = self.clone();
            handles.push(tokio::spawn(async move { engine.refresh_news(&feed).await }));
        }
        if let Some(feed) = non_blank(&self.config.patch_notes_feed).map(str::to_owned) {
            let engine = self.clone();
            handles.push(tokio::spawn(async move {
                engine.refresh_patch_notes(&feed).await
            }));
        }
        if let Some(endpoint) = non_blank(&self.config.status_endpoint).map(str::to_owned) {
            let engine = self.clone();
            handles.push(tokio::spawn(async move {
                engine.refresh_server_status(&endpoint).await
            }));
        }
        handles
    }

    pub async fn refresh_news(&self, endpoint: &str) {
        match self.network.get_json::<Option<Vec<NewsEntry>>>(endpoint).await {
            Ok(Some(entries)) if !entries.is_empty() => {
                info!("refresh: {} news entries from {endpoint}", entries.len());
                self.session.replace_news(entries);
            }
            Ok(_) => info!("refresh: news feed {endpoint} returned no entries"),
            Err(err) => warn!("refresh: failed to load news from {endpoint}: {err}"),
        }
    }

    pub async fn refresh_patch_notes(&self, endpoint: &str) {
        match self
            .network
            .get_json::<Option<Vec<PatchNoteEntry>>>(endpoint)
            .await
        {
            Ok(Some(entries)) if !entries.is_empty() => {
                info!("refresh: {} patch notes from {endpoint}", entries.len());
                self.session.replace_patch_notes(entries);
            }
            Ok(_) => info!("refresh: patch notes feed {endpoint} returned no entries"),
            Err(err) => warn!("refresh: failed to load patch notes from {endpoint}: {err}"),
        }
    }

    pub async fn refresh_server_status(&self, endpoint: &str) {
        match self.network.get_json::<serde_json::Value>(endpoint).await {
            Ok(payload) => match extract_server_state(&payload) {
                Some(state) => {
                    info!("refresh: server state {state:?}");
                    self.session.set_server_state(state);
                }
                None => warn!("refresh: status payload from {endpoint} was inconclusive"),
            },
            Err(err) => warn!("refresh: failed to query server status at {endpoint}: {err}"),
        }
    }

    /// Check the installed client against the asset manifest.
    pub async fn verify(&self) -> ActionOutcome {
        let Some(_guard) = self.session.try_begin(Operation::Verifying) else {
            return ActionOutcome::Rejected;
        };
        info!("action: verify");
        self.session.set_progress(0.0);
        self.session.set_status("Verifying client files...");

        let session = self.session.clone();
        let result = verify::verify_client(
            &self.manifest_path,
            &self.client_dir,
            &self.verify_options,
            |pct| session.set_progress(pct),
        )
        .await;

        match result {
            Ok(report) => {
                if report.is_healthy() {
                    info!("verify: client is healthy");
                } else {
                    warn!(
                        "verify: {} missing, {} mismatched",
                        report.missing.len(),
                        report.mismatched.len()
                    );
                }
                self.session.set_status(report.summary());
            }
            Err(err) => {
                warn!("verify failed: {err}");
                self.session.set_status(err.to_string());
            }
        }
        ActionOutcome::Completed
    }

    /// Fetch the configured client package into the client directory.
    pub async fn download(&self) -> ActionOutcome {
        if self.session.is_busy() {
            return ActionOutcome::Rejected;
        }
        let Some(url) = non_blank(&self.config.download_package_url) else {
            self.session.set_status("Download URL is not configured.");
            return ActionOutcome::Completed;
        };
        let Some(guard) = self.session.try_begin(Operation::Downloading) else {
            return ActionOutcome::Rejected;
        };
        info!("action: download from {url}");
        self.session.set_progress(0.0);
        self.session.set_status("Downloading client...");

        let session = self.session.clone();
        let result = download::download_package(
            &self.downloads,
            url,
            &self.client_dir,
            self.config.download_package_file_name.as_deref(),
            |pct| session.set_progress(pct),
        )
        .await;

        match result {
            Ok(report) => {
                info!(
                    "download: {} bytes written to {}",
                    report.bytes_written,
                    report.path.display()
                );
                self.session.set_progress(100.0);
                self.session.set_status(format!(
                    "Download complete: {}. Extract its contents into {}.",
                    report.file_name,
                    self.client_dir.display()
                ));
            }
            Err(err) => {
                error!("download failed: {err}");
                self.session.set_status(download_failure_message(&err));
            }
        }
        drop(guard);
        self.refresh_executable_state();
        ActionOutcome::Completed
    }

    /// Start the game if its executable can be found. Not a tracked operation.
    pub fn play(&self) -> ActionOutcome {
        if self.session.is_busy() {
            return ActionOutcome::Rejected;
        }
        info!("action: play");
        let Some(executable) = self.refresh_executable_state() else {
            self.session.set_status(if self.is_download_enabled() {
                "Client not found. Use Download to install it before playing."
            } else {
                "Game executable is not configured or was not found."
            });
            return ActionOutcome::Completed;
        };

        match self.launcher.launch_game(&executable) {
            Ok(()) => self.session.set_status("Starting the client..."),
            Err(err) => {
                error!("launch failed: {err}");
                self.session
                    .set_status(format!("Failed to start the client: {err}"));
            }
        }
        ActionOutcome::Completed
    }

    pub fn open_site(&self) -> ActionOutcome {
        if self.session.is_busy() {
            return ActionOutcome::Rejected;
        }
        let Some(url) = non_blank(&self.config.website_url) else {
            self.session.set_status("Website URL is not configured.");
            return ActionOutcome::Completed;
        };
        match self.launcher.open(url) {
            Ok(()) => self.session.set_status("Opening the official website..."),
            Err(err) => self
                .session
                .set_status(format!("Could not open the website: {err}")),
        }
        ActionOutcome::Completed
    }

    pub fn open_settings(&self) -> ActionOutcome {
        if self.session.is_busy() {
            return ActionOutcome::Rejected;
        }
        if !self.settings_path.is_file() {
            self.session.set_status("Configuration file not found.");
            return ActionOutcome::Completed;
        }
        let target = self.settings_path.display().to_string();
        match self.launcher.open(&target) {
            Ok(()) => self.session.set_status("Opening launcher settings..."),
            Err(err) => self
                .session
                .set_status(format!("Failed to open settings: {err}")),
        }
        ActionOutcome::Completed
    }

    /// Re-resolve the game executable and publish whether it exists.
    pub fn refresh_executable_state(&self) -> Option<PathBuf> {
        let executable =
            resolve_game_executable(self.config.game_executable.as_deref(), &self.client_dir)
                .filter(|path| path.is_file());
        self.session.set_executable_available(executable.is_some());
        executable
    }
}

fn download_failure_message(err: &DownloadError) -> String {
    match err {
        DownloadError::MissingUrl => "Download URL is not configured.".into(),
        other => format!("Download failed: {other}"),
    }
}
