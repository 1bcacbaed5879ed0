use serde::{Deserialize, Serialize};

pub const SPEED_RANGE: (f32, f32) = (0.5, 2.0);
pub const FONT_SCALE_RANGE: (f32, f32) = (0.8, 1.5);
pub const LINE_SPACING_RANGE: (f32, f32) = (1.0, 2.0);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlayerMode {
    #[default]
    Prompter,
    Karaoke,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    Idle,
    Ready,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAdvance {
    Advanced,
    /// The last line was passed and the player moved on with `next` semantics.
    SegmentFinished,
}

fn clamp_into(value: f32, (min, max): (f32, f32)) -> Option<f32> {
    value.is_finite().then(|| value.clamp(min, max))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayPreferences {
    pub speed_multiplier: f32,
    pub font_scale: f32,
    pub line_spacing: f32,
    pub mirror: bool,
    pub dark_mode: bool,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            font_scale: 1.0,
            line_spacing: 1.2,
            mirror: false,
            dark_mode: false,
        }
    }
}

impl DisplayPreferences {
    /// Pulls every value back inside its bounds. Used on settings read from disk.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            speed_multiplier: clamp_into(self.speed_multiplier, SPEED_RANGE)
                .unwrap_or(defaults.speed_multiplier),
            font_scale: clamp_into(self.font_scale, FONT_SCALE_RANGE)
                .unwrap_or(defaults.font_scale),
            line_spacing: clamp_into(self.line_spacing, LINE_SPACING_RANGE)
                .unwrap_or(defaults.line_spacing),
            ..self
        }
    }
}

/// Reading session state for the loaded project. Transitions take the current
/// segment count (and line count where it matters) so out-of-range requests
/// can be clamped instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub current_index: usize,
    pub line_index: usize,
    pub is_playing: bool,
    pub mode: PlayerMode,
    /// Prompter scroll position in `0.0..=1.0`.
    pub scroll_progress: f64,
    pub display: DisplayPreferences,
    /// Bumped whenever in-flight timing becomes stale; ticker tasks compare it
    /// before touching the state.
    #[serde(skip)]
    pub epoch: u64,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_index: 0,
            line_index: 0,
            is_playing: false,
            mode: PlayerMode::Prompter,
            scroll_progress: 0.0,
            display: DisplayPreferences::default(),
            epoch: 0,
        }
    }
}

impl PlayerState {
    pub fn new(display: DisplayPreferences) -> Self {
        Self {
            display: display.sanitized(),
            ..Self::default()
        }
    }

    pub fn status(&self, segment_count: usize) -> PlaybackStatus {
        match (segment_count, self.is_playing) {
            (0, _) => PlaybackStatus::Idle,
            (_, true) => PlaybackStatus::Playing,
            (_, false) => PlaybackStatus::Ready,
        }
    }

    pub fn select_segment(&mut self, index: usize, segment_count: usize) {
        if segment_count == 0 {
            return;
        }
        self.current_index = index.min(segment_count - 1);
        self.rewind();
        self.is_playing = false;
    }

    pub fn play_pause(&mut self, segment_count: usize) {
        if segment_count == 0 {
            return;
        }
        if !self.is_playing && self.mode == PlayerMode::Prompter && self.scroll_progress >= 1.0 {
            self.scroll_progress = 0.0;
        }
        self.is_playing = !self.is_playing;
    }

    pub fn restart(&mut self, segment_count: usize) {
        if segment_count == 0 {
            return;
        }
        self.rewind();
        self.is_playing = true;
    }

    pub fn next(&mut self, segment_count: usize) {
        if segment_count == 0 {
            return;
        }
        self.current_index = (self.current_index + 1).min(segment_count - 1);
        self.rewind();
        self.is_playing = false;
    }

    pub fn previous(&mut self, segment_count: usize) {
        if segment_count == 0 {
            return;
        }
        self.current_index = self.current_index.saturating_sub(1).min(segment_count - 1);
        self.rewind();
        self.is_playing = false;
    }

    /// Switches mode and carries the reading position across: scroll progress
    /// becomes a line pointer and back, so the pointer always lands inside the
    /// current segmentation.
    pub fn set_mode(&mut self, mode: PlayerMode, line_count: usize) {
        if mode == self.mode {
            return;
        }
        let lines = line_count.max(1);
        match mode {
            PlayerMode::Karaoke => {
                let line = (self.scroll_progress.clamp(0.0, 1.0) * lines as f64).floor() as usize;
                self.line_index = line.min(lines - 1);
            }
            PlayerMode::Prompter => {
                self.scroll_progress = (self.line_index.min(lines) as f64 / lines as f64).min(1.0);
            }
        }
        self.mode = mode;
    }

    pub fn advance_line(&mut self, line_count: usize, segment_count: usize) -> LineAdvance {
        self.line_index += 1;
        if self.line_index >= line_count.max(1) {
            self.next(segment_count);
            return LineAdvance::SegmentFinished;
        }
        LineAdvance::Advanced
    }

    pub fn set_line_index(&mut self, index: usize, line_count: usize) {
        self.line_index = index.min(line_count.max(1) - 1);
    }

    /// Moves the prompter scroll position; reaching the end stops playback.
    pub fn set_scroll_progress(&mut self, progress: f64) -> bool {
        self.scroll_progress = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let finished = self.scroll_progress >= 1.0;
        if finished {
            self.is_playing = false;
        }
        finished
    }

    pub fn set_speed_multiplier(&mut self, value: f32) {
        if let Some(value) = clamp_into(value, SPEED_RANGE) {
            self.display.speed_multiplier = value;
        }
    }

    pub fn set_font_scale(&mut self, value: f32) {
        if let Some(value) = clamp_into(value, FONT_SCALE_RANGE) {
            self.display.font_scale = value;
        }
    }

    pub fn set_line_spacing(&mut self, value: f32) {
        if let Some(value) = clamp_into(value, LINE_SPACING_RANGE) {
            self.display.line_spacing = value;
        }
    }

    /// Re-anchors the pointer after the segment list changed underneath it.
    /// Playback stops when the selected segment is gone or replaced.
    pub fn clamp_to(&mut self, segment_count: usize, same_segment: bool) {
        if segment_count == 0 {
            self.current_index = 0;
            self.rewind();
            self.is_playing = false;
            return;
        }
        if self.current_index >= segment_count || !same_segment {
            self.current_index = self.current_index.min(segment_count - 1);
            self.rewind();
            self.is_playing = false;
        }
    }

    pub fn reset_position(&mut self) {
        self.current_index = 0;
        self.rewind();
        self.is_playing = false;
    }

    pub fn bump_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    fn rewind(&mut self) {
        self.line_index = 0;
        self.scroll_progress = 0.0;
    }
}
