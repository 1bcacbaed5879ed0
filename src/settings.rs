use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::player::DisplayPreferences;

pub const SAVE_DEBOUNCE_ENV: &str = "DEEPNOURA_SAVE_DEBOUNCE_MS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub display: DisplayPreferences,
    pub save_debounce_ms: u64,
    pub line_width: usize,
    pub tick_interval_ms: u64,
    pub project_file: String,
    pub export_file: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            display: DisplayPreferences::default(),
            save_debounce_ms: 500,
            line_width: 65,
            tick_interval_ms: 50,
            project_file: "project.json".into(),
            export_file: "deepnoura_project.json".into(),
        }
    }
}

impl UserSettings {
    /// Debounce delay, honouring `DEEPNOURA_SAVE_DEBOUNCE_MS` when it parses.
    pub fn save_delay(&self) -> Duration {
        let from_env = std::env::var(SAVE_DEBOUNCE_ENV)
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok());
        Duration::from_millis(from_env.unwrap_or(self.save_debounce_ms))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Settings backed by `settings.json`. A store without a path keeps
/// everything in memory.
pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(Self::sanitized(data)),
        })
    }

    pub fn in_memory(settings: UserSettings) -> Self {
        Self {
            path: None,
            data: RwLock::new(Self::sanitized(settings)),
        }
    }

    pub fn settings(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn display(&self) -> DisplayPreferences {
        self.read().display
    }

    pub fn update_display(&self, display: DisplayPreferences) -> Result<()> {
        let mut guard = self.write();
        if guard.display == display {
            return Ok(());
        }
        guard.display = display.sanitized();
        self.persist(&guard)
    }

    fn sanitized(mut data: UserSettings) -> UserSettings {
        data.display = data.display.sanitized();
        data.line_width = data.line_width.max(1);
        data
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
