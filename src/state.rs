//! Single owner of the mutable app state.
//!
//! Every mutation builds a complete replacement `UiState` from the current one
//! and swaps it in under the lock, then publishes the new snapshot to
//! subscribers. Nothing outside this module mutates fields in place.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::{
    models::{Project, Segment},
    notice::NoticeQueue,
    player::{PlaybackStatus, PlayerState},
    segmentation::{split_into_lines, SegmentationConfig},
};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub project: Project,
    pub player: PlayerState,
    pub notice: NoticeQueue,
}

impl UiState {
    pub fn new(project: Project, player: PlayerState) -> Self {
        Self {
            project,
            player,
            notice: NoticeQueue::default(),
        }
    }

    pub fn segment_count(&self) -> usize {
        self.project.segments.len()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.player.status(self.segment_count())
    }

    /// `None` when the project is empty.
    pub fn current_segment(&self) -> Option<&Segment> {
        self.project.segment(self.player.current_index)
    }

    /// Display lines of the current segment; empty when nothing is selected.
    pub fn current_lines(&self, config: &SegmentationConfig) -> Vec<String> {
        self.current_segment()
            .map(|segment| split_into_lines(&segment.body, config))
            .unwrap_or_default()
    }

    /// Replacement state holding `project`, with the player pointer re-anchored.
    pub fn with_project(&self, project: Project) -> UiState {
        let previous_id = self.current_segment().map(|segment| segment.id.clone());
        let mut player = self.player.clone();
        let same_segment = previous_id.as_deref()
            == project
                .segment(player.current_index)
                .map(|segment| segment.id.as_str());
        player.clamp_to(project.segments.len(), same_segment);
        UiState {
            project,
            player,
            notice: self.notice.clone(),
        }
    }

    pub fn with_player(&self, player: PlayerState) -> UiState {
        UiState {
            player,
            ..self.clone()
        }
    }

    pub fn with_notice(&self, message: &str) -> UiState {
        UiState {
            notice: self.notice.pushed(message),
            ..self.clone()
        }
    }
}

#[derive(Clone)]
pub struct StateHandle {
    state: Arc<Mutex<UiState>>,
    publisher: Arc<watch::Sender<UiState>>,
}

impl StateHandle {
    pub fn new(initial: UiState) -> Self {
        let (publisher, _) = watch::channel(initial.clone());
        Self {
            state: Arc::new(Mutex::new(initial)),
            publisher: Arc::new(publisher),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.publisher.subscribe()
    }

    pub async fn snapshot(&self) -> UiState {
        self.state.lock().await.clone()
    }

    /// Applies `reducer` to the current state. Returning `None` leaves the state
    /// untouched and publishes nothing. Yields the state that is current
    /// afterwards.
    pub async fn update<F>(&self, reducer: F) -> (bool, UiState)
    where
        F: FnOnce(&UiState) -> Option<UiState>,
    {
        let mut guard = self.state.lock().await;
        match reducer(&guard) {
            Some(next) => {
                *guard = next.clone();
                self.publisher.send_replace(next.clone());
                (true, next)
            }
            None => (false, guard.clone()),
        }
    }

    /// Updates only the player half of the state.
    pub async fn update_player<F>(&self, transition: F) -> UiState
    where
        F: FnOnce(&mut PlayerState, &UiState),
    {
        let (_, state) = self
            .update(|current| {
                let mut player = current.player.clone();
                transition(&mut player, current);
                (player != current.player).then(|| current.with_player(player))
            })
            .await;
        state
    }

    pub async fn push_notice(&self, message: &str) {
        self.update(|current| Some(current.with_notice(message))).await;
    }

    pub async fn dismiss_notice(&self) {
        self.update(|current| {
            (!current.notice.is_empty()).then(|| UiState {
                notice: current.notice.dismissed(),
                ..current.clone()
            })
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_of(count: usize) -> Project {
        let mut project = Project::default();
        for i in 0..count {
            project.segments.push(Segment::new(None, format!("body {i}"), 10));
        }
        project
    }

    #[tokio::test]
    async fn subscribers_see_replacements_only() {
        let handle = StateHandle::new(UiState::new(project_of(2), PlayerState::default()));
        let mut rx = handle.subscribe();

        let (changed, _) = handle.update(|_| None).await;
        assert!(!changed);
        assert!(!rx.has_changed().unwrap());

        handle.update_player(|player, state| player.next(state.segment_count())).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().player.current_index, 1);
    }

    #[tokio::test]
    async fn notices_queue_and_dismiss() {
        let handle = StateHandle::new(UiState::default());
        handle.push_notice("Failed to save project").await;
        handle.push_notice("Failed to export project").await;

        assert_eq!(handle.snapshot().await.notice.current(), Some("Failed to save project"));
        handle.dismiss_notice().await;
        assert_eq!(handle.snapshot().await.notice.current(), Some("Failed to export project"));
    }

    #[test]
    fn replacing_project_stops_when_current_segment_disappears() {
        let project = project_of(3);
        let mut player = PlayerState::default();
        player.select_segment(2, 3);
        player.play_pause(3);
        let state = UiState::new(project.clone(), player);

        let mut trimmed = project.clone();
        trimmed.segments.truncate(2);
        let next = state.with_project(trimmed);
        assert_eq!(next.player.current_index, 1);
        assert!(!next.player.is_playing);

        let renamed = state.with_project(project.renamed("Keynote", 5));
        assert!(renamed.player.is_playing);
        assert_eq!(renamed.player.current_index, 2);
    }

    #[test]
    fn empty_project_has_neutral_view() {
        let state = UiState::default();
        assert!(state.current_segment().is_none());
        assert!(state.current_lines(&SegmentationConfig::default()).is_empty());
        assert_eq!(state.status(), PlaybackStatus::Idle);
    }
}
