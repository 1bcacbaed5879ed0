//! User intents and the queue that applies them one at a time.
//!
//! Every surface that can change the project or the player (builder screen,
//! player controls, a second window) submits intents here, so all mutations
//! run sequentially against the single state owner.

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use log::{info, warn};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    error::ProjectError,
    models::{Segment, SegmentDraft},
    player::PlayerMode,
    AppContext,
};

#[derive(Debug, Clone)]
pub enum Intent {
    // Builder
    AddEmptySegment,
    UpsertSegment(Segment),
    SaveDraft {
        existing_id: Option<String>,
        draft: SegmentDraft,
    },
    DeleteSegment(String),
    MoveSegmentUp(String),
    MoveSegmentDown(String),
    RenameProject(String),
    ImportProject(PathBuf),
    ExportProject,

    // Player
    SelectSegment(usize),
    PlayPause,
    Restart,
    Next,
    Previous,
    SetMode(PlayerMode),
    AdvanceLine,
    SetLineIndex(usize),
    SetSpeedMultiplier(f32),
    SetFontScale(f32),
    SetLineSpacing(f32),
    SetMirror(bool),
    SetDarkMode(bool),

    DismissNotice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntentOutcome {
    Applied,
    /// Nothing changed (unknown id, boundary move, ...).
    Unchanged,
    SegmentAdded(String),
    SegmentSaved(Segment),
    Exported(PathBuf),
}

impl IntentOutcome {
    fn from_changed(changed: bool) -> Self {
        if changed {
            IntentOutcome::Applied
        } else {
            IntentOutcome::Unchanged
        }
    }
}

impl AppContext {
    /// Applies one intent. I/O failures have already raised a notice when
    /// they come back as `Err`.
    pub async fn dispatch(&self, intent: Intent) -> Result<IntentOutcome, ProjectError> {
        let store = self.store();
        let player = self.player();

        let outcome = match intent {
            Intent::AddEmptySegment => IntentOutcome::SegmentAdded(store.add_empty_segment().await),
            Intent::UpsertSegment(segment) => {
                IntentOutcome::from_changed(store.upsert_segment(segment).await)
            }
            Intent::SaveDraft { existing_id, draft } => IntentOutcome::SegmentSaved(
                store.save_draft(existing_id.as_deref(), &draft).await,
            ),
            Intent::DeleteSegment(id) => IntentOutcome::from_changed(store.delete_segment(&id).await),
            Intent::MoveSegmentUp(id) => {
                IntentOutcome::from_changed(store.move_segment_up(&id).await)
            }
            Intent::MoveSegmentDown(id) => {
                IntentOutcome::from_changed(store.move_segment_down(&id).await)
            }
            Intent::RenameProject(name) => {
                IntentOutcome::from_changed(store.rename_project(&name).await)
            }
            Intent::ImportProject(source) => {
                store.import_project(&source).await?;
                IntentOutcome::Applied
            }
            Intent::ExportProject => IntentOutcome::Exported(store.export_project().await?),

            Intent::SelectSegment(index) => {
                player.select_segment(index).await;
                IntentOutcome::Applied
            }
            Intent::PlayPause => {
                player.play_pause().await;
                IntentOutcome::Applied
            }
            Intent::Restart => {
                player.restart().await;
                IntentOutcome::Applied
            }
            Intent::Next => {
                player.next().await;
                IntentOutcome::Applied
            }
            Intent::Previous => {
                player.previous().await;
                IntentOutcome::Applied
            }
            Intent::SetMode(mode) => {
                player.set_mode(mode).await;
                IntentOutcome::Applied
            }
            Intent::AdvanceLine => {
                player.advance_line().await;
                IntentOutcome::Applied
            }
            Intent::SetLineIndex(index) => {
                player.set_line_index(index).await;
                IntentOutcome::Applied
            }
            Intent::SetSpeedMultiplier(value) => {
                player.set_speed_multiplier(value).await;
                IntentOutcome::Applied
            }
            Intent::SetFontScale(value) => {
                player.set_font_scale(value).await;
                IntentOutcome::Applied
            }
            Intent::SetLineSpacing(value) => {
                player.set_line_spacing(value).await;
                IntentOutcome::Applied
            }
            Intent::SetMirror(enabled) => {
                player.set_mirror(enabled).await;
                IntentOutcome::Applied
            }
            Intent::SetDarkMode(enabled) => {
                player.set_dark_mode(enabled).await;
                IntentOutcome::Applied
            }
            Intent::DismissNotice => {
                self.state().dismiss_notice().await;
                IntentOutcome::Applied
            }
        };

        Ok(outcome)
    }
}

type Reply = oneshot::Sender<Result<IntentOutcome, ProjectError>>;

struct QueuedIntent {
    intent: Intent,
    reply: Option<Reply>,
}

/// Sending half of the intent queue. Cheap to clone; one per UI surface.
#[derive(Clone)]
pub struct IntentQueue {
    sender: mpsc::UnboundedSender<QueuedIntent>,
}

impl IntentQueue {
    /// Starts the worker that drains the queue in order. It exits once every
    /// `IntentQueue` clone has been dropped.
    pub fn spawn(app: Arc<AppContext>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<QueuedIntent>();

        let handle = tokio::spawn(async move {
            while let Some(QueuedIntent { intent, reply }) = receiver.recv().await {
                let result = app.dispatch(intent).await;
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                } else if let Err(err) = result {
                    warn!("intent failed: {err}");
                }
            }
            info!("Intent queue closed");
        });

        (Self { sender }, handle)
    }

    /// Fire and forget.
    pub fn submit(&self, intent: Intent) -> Result<()> {
        self.sender
            .send(QueuedIntent {
                intent,
                reply: None,
            })
            .map_err(|_| anyhow!("intent queue is closed"))
    }

    /// Queues `intent` and waits until it has been applied.
    pub async fn send(&self, intent: Intent) -> Result<IntentOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(QueuedIntent {
                intent,
                reply: Some(reply_tx),
            })
            .map_err(|_| anyhow!("intent queue is closed"))?;

        let result = reply_rx
            .await
            .map_err(|_| anyhow!("intent worker stopped before replying"))?;
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        settings::{SettingsStore, UserSettings},
        storage::testing::RecordingGateway,
        PlaybackStatus,
    };

    async fn app() -> (Arc<AppContext>, Arc<RecordingGateway>) {
        let gateway = Arc::new(RecordingGateway::default());
        let settings = SettingsStore::in_memory(UserSettings::default());
        let app = AppContext::with_gateway(gateway.clone(), settings).await;
        (Arc::new(app), gateway)
    }

    #[tokio::test]
    async fn intents_apply_in_submission_order() {
        let (app, _) = app().await;
        let (queue, _worker) = IntentQueue::spawn(app.clone());

        queue.submit(Intent::AddEmptySegment).unwrap();
        queue.submit(Intent::AddEmptySegment).unwrap();
        queue.submit(Intent::RenameProject("Talk".into())).unwrap();
        let outcome = queue.send(Intent::SelectSegment(1)).await.unwrap();

        assert_eq!(outcome, IntentOutcome::Applied);
        let state = app.snapshot().await;
        assert_eq!(state.project.segments.len(), 2);
        assert_eq!(state.project.project_name, "Talk");
        assert_eq!(state.player.current_index, 1);
    }

    #[tokio::test]
    async fn boundary_moves_report_unchanged() {
        let (app, _) = app().await;
        let (queue, _worker) = IntentQueue::spawn(app.clone());

        let IntentOutcome::SegmentAdded(id) = queue.send(Intent::AddEmptySegment).await.unwrap()
        else {
            panic!("expected a new segment id");
        };

        assert_eq!(
            queue.send(Intent::MoveSegmentUp(id.clone())).await.unwrap(),
            IntentOutcome::Unchanged
        );
        assert_eq!(
            queue.send(Intent::DeleteSegment("ghost".into())).await.unwrap(),
            IntentOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn failed_import_comes_back_as_error_with_notice() {
        let (app, _) = app().await;
        let (queue, _worker) = IntentQueue::spawn(app.clone());

        let err = queue
            .send(Intent::ImportProject(PathBuf::from("missing.json")))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("failed to import project"));
        assert_eq!(
            app.snapshot().await.notice.current(),
            Some("Failed to import project")
        );
        queue.send(Intent::DismissNotice).await.unwrap();
        assert!(app.snapshot().await.notice.is_empty());
    }

    #[tokio::test]
    async fn empty_project_play_pause_stays_idle() {
        let (app, _) = app().await;
        let (queue, _worker) = IntentQueue::spawn(app.clone());

        queue.send(Intent::PlayPause).await.unwrap();

        assert_eq!(app.snapshot().await.status(), PlaybackStatus::Idle);
    }

    #[tokio::test]
    async fn worker_stops_when_queue_dropped() {
        let (app, _) = app().await;
        let (queue, worker) = IntentQueue::spawn(app);

        drop(queue);

        worker.await.unwrap();
    }
}
