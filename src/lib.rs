mod error;
mod intents;
mod models;
mod notice;
mod player;
mod project;
mod segmentation;
mod settings;
mod state;
mod storage;
mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::watch;

pub use error::ProjectError;
pub use intents::{Intent, IntentOutcome, IntentQueue};
pub use models::{format_duration, Project, Segment, SegmentDraft};
pub use notice::NoticeQueue;
pub use player::{
    DisplayPreferences, LineAdvance, PlaybackController, PlaybackSnapshot, PlaybackStatus,
    PlayerMode, PlayerState,
};
pub use project::{ProjectStore, SaveDebouncer};
pub use segmentation::{split_into_lines, SegmentationConfig};
pub use settings::{SettingsStore, UserSettings};
pub use state::{StateHandle, UiState};
pub use storage::{FileGateway, ProjectFiles, ProjectGateway};

/// Initialise logging (reads `RUST_LOG`, defaults to info). Safe to call more
/// than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// Everything one running reader needs, wired around a single state owner.
pub struct AppContext {
    state: StateHandle,
    store: ProjectStore,
    player: PlaybackController,
    settings: SettingsStore,
}

impl AppContext {
    /// Opens (or creates) the data directory, loads settings and the saved
    /// project. A project that fails to load leaves an empty project and a
    /// notice rather than an error.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let user = settings.settings();
        let files = ProjectFiles::in_dir(data_dir, &user.project_file, &user.export_file);
        let gateway = FileGateway::new(files)?;

        info!("Opening reader data in {}", data_dir.display());
        Ok(Self::with_gateway(Arc::new(gateway), settings).await)
    }

    pub async fn with_gateway(gateway: Arc<dyn ProjectGateway>, settings: SettingsStore) -> Self {
        let user = settings.settings();
        let state = StateHandle::new(UiState::new(
            Project::default(),
            PlayerState::new(user.display),
        ));
        let store = ProjectStore::new(state.clone(), gateway, user.save_delay());
        let player = PlaybackController::new(
            state.clone(),
            SegmentationConfig::with_width(user.line_width),
            user.tick_interval(),
        );

        // Failure is already surfaced as a notice.
        let _ = store.load().await;

        Self {
            state,
            store,
            player,
            settings,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    pub async fn snapshot(&self) -> UiState {
        self.state.snapshot().await
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn player(&self) -> &PlaybackController {
        &self.player
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Teardown: stops timing, keeps the display preferences for next launch
    /// and writes any pending project change.
    pub async fn shutdown(&self) -> Result<(), ProjectError> {
        self.player.shutdown().await;

        let display = self.player.display().await;
        if let Err(err) = self.settings.update_display(display) {
            warn!("Failed to persist display preferences: {err:#}");
        }

        self.store.flush().await
    }
}
