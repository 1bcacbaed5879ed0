mod file;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{error::ProjectError, models::Project};

pub use file::{FileGateway, ProjectFiles};

/// Boundary between the in-memory project and wherever it is stored. Every
/// failure comes back as a `ProjectError` so callers can turn it into a notice.
#[async_trait]
pub trait ProjectGateway: Send + Sync + 'static {
    /// A missing store is a fresh empty project, not an error.
    async fn load(&self) -> Result<Project, ProjectError>;

    async fn save(&self, project: &Project) -> Result<(), ProjectError>;

    /// Parses `source` as a project, stamps `updatedAt` to now and persists it
    /// as the current project.
    async fn import_from(&self, source: &Path) -> Result<Project, ProjectError>;

    /// Writes a shareable copy of `project` and returns where it landed.
    async fn export(&self, project: &Project) -> Result<PathBuf, ProjectError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use anyhow::anyhow;

    use super::*;

    /// In-memory gateway that records every save.
    #[derive(Default)]
    pub struct RecordingGateway {
        pub stored: Mutex<Option<Project>>,
        pub saves: Mutex<Vec<Project>>,
        pub imports: Mutex<Vec<(PathBuf, Result<Project, String>)>>,
        pub fail_saves: bool,
        pub fail_load: bool,
        pub fail_export: bool,
    }

    impl RecordingGateway {
        pub fn with_project(project: Project) -> Self {
            Self {
                stored: Mutex::new(Some(project)),
                ..Self::default()
            }
        }

        pub fn failing_saves() -> Self {
            Self {
                fail_saves: true,
                ..Self::default()
            }
        }

        pub fn with_import(self, source: &str, outcome: Result<Project, String>) -> Self {
            self.imports
                .lock()
                .unwrap()
                .push((PathBuf::from(source), outcome));
            self
        }

        pub fn save_count(&self) -> usize {
            self.saves.lock().unwrap().len()
        }

        pub fn last_save(&self) -> Option<Project> {
            self.saves.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl ProjectGateway for RecordingGateway {
        async fn load(&self) -> Result<Project, ProjectError> {
            if self.fail_load {
                return Err(ProjectError::Load(anyhow!("unreadable")));
            }
            Ok(self.stored.lock().unwrap().clone().unwrap_or_default())
        }

        async fn save(&self, project: &Project) -> Result<(), ProjectError> {
            if self.fail_saves {
                return Err(ProjectError::Save(anyhow!("disk full")));
            }
            self.saves.lock().unwrap().push(project.clone());
            *self.stored.lock().unwrap() = Some(project.clone());
            Ok(())
        }

        async fn import_from(&self, source: &Path) -> Result<Project, ProjectError> {
            let outcome = self
                .imports
                .lock()
                .unwrap()
                .iter()
                .find(|(path, _)| path == source)
                .map(|(_, outcome)| outcome.clone())
                .unwrap_or_else(|| Err("no such file".into()));
            match outcome {
                Ok(mut project) => {
                    project.updated_at = crate::models::now_millis();
                    *self.stored.lock().unwrap() = Some(project.clone());
                    Ok(project)
                }
                Err(reason) => Err(ProjectError::Import(anyhow!(reason))),
            }
        }

        async fn export(&self, project: &Project) -> Result<PathBuf, ProjectError> {
            if self.fail_export {
                return Err(ProjectError::Export(anyhow!("read-only share target")));
            }
            let _ = project;
            Ok(PathBuf::from("exports/deepnoura_project.json"))
        }
    }
}
