use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use log::{error, info, warn};

use super::debounce::SaveDebouncer;
use crate::{
    error::ProjectError,
    models::{now_millis, Project, Segment, SegmentDraft},
    state::StateHandle,
    storage::ProjectGateway,
};

/// CRUD over the loaded project. Each effective change replaces the project
/// wholesale and schedules a debounced save; no-op requests persist nothing.
#[derive(Clone)]
pub struct ProjectStore {
    state: StateHandle,
    gateway: Arc<dyn ProjectGateway>,
    saver: SaveDebouncer,
}

impl ProjectStore {
    pub fn new(state: StateHandle, gateway: Arc<dyn ProjectGateway>, save_delay: Duration) -> Self {
        let saver = SaveDebouncer::new(gateway.clone(), state.clone(), save_delay);
        Self {
            state,
            gateway,
            saver,
        }
    }

    /// Startup load. A failure leaves the empty project in place and raises a
    /// notice.
    pub async fn load(&self) -> Result<(), ProjectError> {
        match self.gateway.load().await {
            Ok(project) => {
                info!(
                    "Loaded project '{}' with {} segments",
                    project.project_name,
                    project.segments.len()
                );
                self.state
                    .update(|current| Some(current.with_project(project)))
                    .await;
                Ok(())
            }
            Err(err) => {
                error!("{err}");
                self.state.push_notice(err.notice()).await;
                Err(err)
            }
        }
    }

    pub async fn upsert_segment(&self, segment: Segment) -> bool {
        self.commit(move |project, now| Some(project.upserted(segment, now)))
            .await
    }

    /// Appends a blank 60 second segment and returns its id.
    pub async fn add_empty_segment(&self) -> String {
        let segment = Segment::empty();
        let id = segment.id.clone();
        self.upsert_segment(segment).await;
        id
    }

    /// Commits an editor draft, either onto the segment `existing_id` names or
    /// as a new segment when that id is absent.
    pub async fn save_draft(&self, existing_id: Option<&str>, draft: &SegmentDraft) -> Segment {
        let existing = match existing_id {
            Some(id) => {
                let snapshot = self.state.snapshot().await;
                snapshot
                    .project
                    .position_of(id)
                    .and_then(|idx| snapshot.project.segment(idx).cloned())
            }
            None => None,
        };
        let segment = draft.commit(existing.as_ref());
        self.upsert_segment(segment.clone()).await;
        segment
    }

    pub async fn delete_segment(&self, id: &str) -> bool {
        self.commit(|project, now| project.without(id, now)).await
    }

    pub async fn move_segment_up(&self, id: &str) -> bool {
        self.commit(|project, now| project.moved_up(id, now)).await
    }

    pub async fn move_segment_down(&self, id: &str) -> bool {
        self.commit(|project, now| project.moved_down(id, now)).await
    }

    pub async fn rename_project(&self, name: &str) -> bool {
        self.commit(|project, now| {
            (project.project_name != name).then(|| project.renamed(name, now))
        })
        .await
    }

    /// Replaces the current project with the one in `source`. On failure the
    /// in-memory project is untouched and a notice is raised.
    pub async fn import_project(&self, source: &Path) -> Result<(), ProjectError> {
        // A debounced save landing mid-import would overwrite the imported file.
        let had_pending = self.saver.has_pending().await;
        self.saver.cancel().await;

        match self.gateway.import_from(source).await {
            Ok(project) => {
                info!(
                    "Imported project '{}' from {}",
                    project.project_name,
                    source.display()
                );
                self.state
                    .update(|current| {
                        let mut next = current.with_project(project);
                        next.player.reset_position();
                        next.player.bump_epoch();
                        Some(next)
                    })
                    .await;
                Ok(())
            }
            Err(err) => {
                warn!("{err}");
                if had_pending {
                    self.saver.schedule().await;
                }
                self.state.push_notice(err.notice()).await;
                Err(err)
            }
        }
    }

    /// Writes a shareable copy of the current project.
    pub async fn export_project(&self) -> Result<PathBuf, ProjectError> {
        let project = self.state.snapshot().await.project;
        match self.gateway.export(&project).await {
            Ok(path) => {
                info!("Exported project to {}", path.display());
                Ok(path)
            }
            Err(err) => {
                error!("{err}");
                self.state.push_notice(err.notice()).await;
                Err(err)
            }
        }
    }

    /// Writes any pending edit immediately.
    pub async fn flush(&self) -> Result<(), ProjectError> {
        self.saver.flush().await
    }

    pub async fn has_pending_save(&self) -> bool {
        self.saver.has_pending().await
    }

    async fn commit<F>(&self, change: F) -> bool
    where
        F: FnOnce(&Project, i64) -> Option<Project>,
    {
        let now = now_millis();
        let (changed, _) = self
            .state
            .update(|current| {
                change(&current.project, now).map(|project| current.with_project(project))
            })
            .await;
        if changed {
            self.saver.schedule().await;
        }
        changed
    }
}
