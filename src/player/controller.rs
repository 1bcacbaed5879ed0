use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::{
    state::{LineAdvance, PlaybackStatus, PlayerMode, PlayerState},
    timing::{line_duration, remaining_scroll, scroll_duration},
    DisplayPreferences,
};
use crate::{
    segmentation::{timed_line_count, SegmentationConfig},
    state::{StateHandle, UiState},
};

// Set to true to trace ticker activity
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// What a player screen needs to render the current segment.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub player: PlayerState,
    pub segment_title: Option<String>,
    pub lines: Vec<String>,
    pub line_duration_ms: u64,
    pub scroll_duration_ms: u64,
    /// Prompter time left at the current speed and scroll position.
    pub remaining_ms: u64,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Drives the reading session: transitions go through the shared state and a
/// single ticker task advances karaoke lines or prompter scroll while playing.
#[derive(Clone)]
pub struct PlaybackController {
    state: StateHandle,
    segmentation: SegmentationConfig,
    tick_interval: Duration,
    ticker: Arc<Mutex<Option<Ticker>>>,
}

fn line_count_of(state: &UiState, segmentation: &SegmentationConfig) -> usize {
    state
        .current_segment()
        .map(|segment| timed_line_count(&segment.body, segmentation))
        .unwrap_or(1)
}

impl PlaybackController {
    pub fn new(state: StateHandle, segmentation: SegmentationConfig, tick_interval: Duration) -> Self {
        Self {
            state,
            segmentation,
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        let state = self.state.snapshot().await;
        let speed = state.player.display.speed_multiplier;
        let lines = state.current_lines(&self.segmentation);
        let progress = state.player.scroll_progress;
        let (segment_title, line_ms, scroll_ms, remaining_ms) = match state.current_segment() {
            Some(segment) => (
                Some(segment.display_title(state.player.current_index)),
                line_duration(segment.duration_sec, lines.len(), speed).as_millis() as u64,
                scroll_duration(segment.duration_sec, speed).as_millis() as u64,
                remaining_scroll(segment.duration_sec, speed, progress).as_millis() as u64,
            ),
            None => (None, 0, 0, 0),
        };

        PlaybackSnapshot {
            status: state.status(),
            player: state.player,
            segment_title,
            lines,
            line_duration_ms: line_ms,
            scroll_duration_ms: scroll_ms,
            remaining_ms,
        }
    }

    pub async fn select_segment(&self, index: usize) {
        self.retime(|player, state| player.select_segment(index, state.segment_count()))
            .await;
    }

    pub async fn play_pause(&self) {
        self.retime(|player, state| player.play_pause(state.segment_count()))
            .await;
    }

    pub async fn restart(&self) {
        self.retime(|player, state| player.restart(state.segment_count()))
            .await;
    }

    pub async fn next(&self) {
        self.retime(|player, state| player.next(state.segment_count()))
            .await;
    }

    pub async fn previous(&self) {
        self.retime(|player, state| player.previous(state.segment_count()))
            .await;
    }

    pub async fn set_mode(&self, mode: PlayerMode) {
        let segmentation = self.segmentation;
        self.retime(|player, state| player.set_mode(mode, line_count_of(state, &segmentation)))
            .await;
    }

    /// Moves the karaoke highlight one line on; past the last line the player
    /// moves to the next segment.
    pub async fn advance_line(&self) -> LineAdvance {
        let segmentation = self.segmentation;
        let mut outcome = LineAdvance::Advanced;
        self.retime(|player, state| {
            outcome =
                player.advance_line(line_count_of(state, &segmentation), state.segment_count());
        })
        .await;
        outcome
    }

    pub async fn set_line_index(&self, index: usize) {
        let segmentation = self.segmentation;
        self.retime(|player, state| {
            player.set_line_index(index, line_count_of(state, &segmentation))
        })
        .await;
    }

    pub async fn set_speed_multiplier(&self, value: f32) {
        self.retime(|player, _| player.set_speed_multiplier(value))
            .await;
    }

    pub async fn set_font_scale(&self, value: f32) {
        self.state
            .update_player(|player, _| player.set_font_scale(value))
            .await;
    }

    pub async fn set_line_spacing(&self, value: f32) {
        self.state
            .update_player(|player, _| player.set_line_spacing(value))
            .await;
    }

    pub async fn set_mirror(&self, enabled: bool) {
        self.state
            .update_player(|player, _| player.display.mirror = enabled)
            .await;
    }

    pub async fn set_dark_mode(&self, enabled: bool) {
        self.state
            .update_player(|player, _| player.display.dark_mode = enabled)
            .await;
    }

    pub async fn display(&self) -> DisplayPreferences {
        self.state.snapshot().await.player.display
    }

    /// Stops any in-flight timing without touching the play flag.
    pub async fn shutdown(&self) {
        self.cancel_ticker().await;
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel.cancel();
            ticker.handle.abort();
        }
    }

    /// Applies `change` and invalidates in-flight timing in the same state
    /// update, then replaces the ticker to match. A ticker waking between the
    /// two can never see the new state under its old epoch, and timing resumes
    /// from the current line or scroll position rather than the segment start.
    async fn retime<F>(&self, change: F)
    where
        F: FnOnce(&mut PlayerState, &UiState),
    {
        let mut guard = self.ticker.lock().await;
        if let Some(previous) = guard.take() {
            previous.cancel.cancel();
            previous.handle.abort();
        }

        let state = self
            .state
            .update_player(|player, current| {
                change(player, current);
                player.bump_epoch();
            })
            .await;

        if state.status() != PlaybackStatus::Playing {
            return;
        }

        let epoch = state.player.epoch;
        let cancel = CancellationToken::new();
        let handle = match state.player.mode {
            PlayerMode::Karaoke => tokio::spawn(karaoke_loop(
                self.state.clone(),
                self.segmentation,
                epoch,
                cancel.clone(),
            )),
            PlayerMode::Prompter => tokio::spawn(prompter_loop(
                self.state.clone(),
                self.tick_interval,
                epoch,
                cancel.clone(),
            )),
        };

        *guard = Some(Ticker { handle, cancel });
    }
}

fn is_current(state: &UiState, epoch: u64, mode: PlayerMode) -> bool {
    state.player.epoch == epoch && state.player.is_playing && state.player.mode == mode
}

async fn karaoke_loop(
    state: StateHandle,
    segmentation: SegmentationConfig,
    epoch: u64,
    cancel: CancellationToken,
) {
    loop {
        let wait = {
            let snapshot = state.snapshot().await;
            if !is_current(&snapshot, epoch, PlayerMode::Karaoke) {
                break;
            }
            let Some(segment) = snapshot.current_segment() else {
                break;
            };
            line_duration(
                segment.duration_sec,
                timed_line_count(&segment.body, &segmentation),
                snapshot.player.display.speed_multiplier,
            )
        };

        tokio::select! {
            _ = time::sleep(wait) => {}
            _ = cancel.cancelled() => break,
        }

        let mut outcome = None;
        let (_, after) = state
            .update(|current| {
                if !is_current(current, epoch, PlayerMode::Karaoke) {
                    return None;
                }
                let mut player = current.player.clone();
                outcome = Some(player.advance_line(
                    line_count_of(current, &segmentation),
                    current.segment_count(),
                ));
                Some(current.with_player(player))
            })
            .await;

        match outcome {
            Some(LineAdvance::Advanced) => {
                log_debug!("karaoke advanced to line {}", after.player.line_index);
            }
            Some(LineAdvance::SegmentFinished) => {
                log_info!(
                    "karaoke finished segment, now at index {}",
                    after.player.current_index
                );
                break;
            }
            None => break,
        }
    }
}

async fn prompter_loop(
    state: StateHandle,
    tick_interval: Duration,
    epoch: u64,
    cancel: CancellationToken,
) {
    let (baseline, total) = {
        let snapshot = state.snapshot().await;
        let Some(segment) = snapshot.current_segment() else {
            return;
        };
        (
            snapshot.player.scroll_progress,
            scroll_duration(segment.duration_sec, snapshot.player.display.speed_multiplier),
        )
    };
    if total.is_zero() {
        return;
    }

    let anchor = Instant::now();
    let mut ticker = time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => break,
        }

        let progress = baseline + anchor.elapsed().as_secs_f64() / total.as_secs_f64();
        let mut finished = false;
        let (changed, _) = state
            .update(|current| {
                if !is_current(current, epoch, PlayerMode::Prompter) {
                    return None;
                }
                let mut player = current.player.clone();
                finished = player.set_scroll_progress(progress);
                Some(current.with_player(player))
            })
            .await;

        if !changed {
            break;
        }
        if finished {
            log_info!("prompter reached the end of the segment");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, Segment};
    use tokio::time::sleep;

    // With width 10 this body splits into exactly three lines.
    const THREE_LINES: &str = "aaaa bbbb cccc dddd eeee ffff";

    fn project(durations: &[u32]) -> Project {
        let mut project = Project::default();
        for duration in durations {
            project
                .segments
                .push(Segment::new(None, THREE_LINES, *duration));
        }
        project
    }

    fn controller_for(project: Project) -> (PlaybackController, StateHandle) {
        let state = StateHandle::new(UiState::new(project, PlayerState::default()));
        let controller = PlaybackController::new(
            state.clone(),
            SegmentationConfig::with_width(10),
            Duration::from_millis(50),
        );
        (controller, state)
    }

    async fn player(state: &StateHandle) -> PlayerState {
        state.snapshot().await.player
    }

    #[tokio::test(start_paused = true)]
    async fn karaoke_lines_advance_on_schedule_then_move_on() {
        let (controller, state) = controller_for(project(&[60, 30]));
        controller.set_mode(PlayerMode::Karaoke).await;
        controller.play_pause().await;

        sleep(Duration::from_secs(19)).await;
        assert_eq!(player(&state).await.line_index, 0);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(player(&state).await.line_index, 1);
        sleep(Duration::from_secs(20)).await;
        assert_eq!(player(&state).await.line_index, 2);
        sleep(Duration::from_secs(20)).await;

        let after = player(&state).await;
        assert_eq!(after.current_index, 1);
        assert_eq!(after.line_index, 0);
        assert!(!after.is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn karaoke_speed_halves_line_time() {
        let (controller, state) = controller_for(project(&[60]));
        controller.set_mode(PlayerMode::Karaoke).await;
        controller.set_speed_multiplier(2.0).await;
        controller.play_pause().await;

        sleep(Duration::from_secs(9)).await;
        assert_eq!(player(&state).await.line_index, 0);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(player(&state).await.line_index, 1);

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.line_duration_ms, 10_000);
        assert_eq!(snapshot.lines.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn speed_change_mid_line_invalidates_old_timing_in_one_update() {
        let (controller, state) = controller_for(project(&[60]));
        controller.set_mode(PlayerMode::Karaoke).await;
        controller.play_pause().await;
        sleep(Duration::from_secs(15)).await;

        let before = player(&state).await;
        let mut updates = state.subscribe();
        controller.set_speed_multiplier(2.0).await;

        let published = updates.borrow_and_update().player.clone();
        assert_eq!(published.display.speed_multiplier, 2.0);
        assert_eq!(published.epoch, before.epoch + 1);
        assert!(published.is_playing);

        // The old 20s line would have fired at t=20; the new 10s one lands at t=25.
        sleep(Duration::from_secs(9)).await;
        assert_eq!(player(&state).await.line_index, 0);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(player(&state).await.line_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn last_segment_stops_at_end() {
        let (controller, state) = controller_for(project(&[3]));
        controller.set_mode(PlayerMode::Karaoke).await;
        controller.play_pause().await;

        sleep(Duration::from_secs(10)).await;

        let after = player(&state).await;
        assert_eq!(after.current_index, 0);
        assert!(!after.is_playing);
        assert_eq!(state.snapshot().await.status(), PlaybackStatus::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_cancels_timer_and_resume_restarts_current_line() {
        let (controller, state) = controller_for(project(&[60]));
        controller.set_mode(PlayerMode::Karaoke).await;
        controller.play_pause().await;

        sleep(Duration::from_secs(25)).await;
        controller.play_pause().await;
        sleep(Duration::from_secs(100)).await;
        assert_eq!(player(&state).await.line_index, 1);
        assert!(!player(&state).await.is_playing);

        controller.play_pause().await;
        sleep(Duration::from_secs(19)).await;
        assert_eq!(player(&state).await.line_index, 1);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(player(&state).await.line_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn prompter_scrolls_linearly_and_resumes_from_position() {
        let (controller, state) = controller_for(project(&[10]));
        controller.play_pause().await;

        sleep(Duration::from_millis(5_020)).await;
        let halfway = player(&state).await.scroll_progress;
        assert!((0.45..=0.55).contains(&halfway), "progress {halfway}");

        controller.play_pause().await;
        sleep(Duration::from_secs(30)).await;
        assert_eq!(player(&state).await.scroll_progress, halfway);

        controller.play_pause().await;
        sleep(Duration::from_millis(4_000)).await;
        assert!(player(&state).await.is_playing);
        sleep(Duration::from_millis(1_500)).await;

        let after = player(&state).await;
        assert_eq!(after.scroll_progress, 1.0);
        assert!(!after.is_playing);
        assert_eq!(after.current_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_project_play_is_noop() {
        let (controller, state) = controller_for(Project::default());

        controller.play_pause().await;
        controller.next().await;
        controller.restart().await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.status, PlaybackStatus::Idle);
        assert!(snapshot.lines.is_empty());
        assert!(snapshot.segment_title.is_none());
        assert!(!player(&state).await.is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_mode_mid_play_keeps_position_and_retimes() {
        let (controller, state) = controller_for(project(&[60]));
        controller.set_mode(PlayerMode::Karaoke).await;
        controller.play_pause().await;
        sleep(Duration::from_secs(21)).await;

        controller.set_mode(PlayerMode::Prompter).await;
        let switched = player(&state).await;
        assert!(switched.is_playing);
        assert!((switched.scroll_progress - 1.0 / 3.0).abs() < 1e-9);

        sleep(Duration::from_secs(30)).await;
        let after = player(&state).await;
        assert_eq!(after.line_index, 1);
        assert!(after.scroll_progress > switched.scroll_progress);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_stops_playback() {
        let (controller, state) = controller_for(project(&[20, 20, 20]));
        controller.play_pause().await;
        controller.next().await;
        controller.next().await;
        controller.next().await;
        assert_eq!(player(&state).await.current_index, 2);
        assert!(!player(&state).await.is_playing);

        controller.select_segment(99).await;
        assert_eq!(player(&state).await.current_index, 2);
        controller.previous().await;
        assert_eq!(player(&state).await.current_index, 1);

        controller.restart().await;
        assert!(player(&state).await.is_playing);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_advance_past_end_moves_to_next_segment() {
        let (controller, state) = controller_for(project(&[60, 60]));
        controller.set_mode(PlayerMode::Karaoke).await;
        controller.set_line_index(2).await;

        assert_eq!(controller.advance_line().await, LineAdvance::SegmentFinished);
        assert_eq!(player(&state).await.current_index, 1);
    }
}
