//! Reading-time math shared by both modes.
//!
//! A segment's `durationSec` is its full reading time at 1.0x. Prompter mode
//! scrolls linearly across that time; karaoke mode splits it evenly between
//! lines. The speed multiplier divides every duration.

use std::time::Duration;

fn effective_speed(speed_multiplier: f32) -> f64 {
    if speed_multiplier.is_finite() && speed_multiplier > 0.0 {
        f64::from(speed_multiplier)
    } else {
        1.0
    }
}

/// Time the prompter takes to traverse the whole text.
pub fn scroll_duration(duration_sec: u32, speed_multiplier: f32) -> Duration {
    Duration::from_secs_f64(f64::from(duration_sec) / effective_speed(speed_multiplier))
}

/// Time left to scroll from `progress` to the end.
pub fn remaining_scroll(duration_sec: u32, speed_multiplier: f32, progress: f64) -> Duration {
    let left = (1.0 - progress.clamp(0.0, 1.0)).max(0.0);
    scroll_duration(duration_sec, speed_multiplier).mul_f64(left)
}

/// Highlight time for one karaoke line. A zero line count is treated as one
/// line spanning the whole segment.
pub fn line_duration(duration_sec: u32, line_count: usize, speed_multiplier: f32) -> Duration {
    let per_line = f64::from(duration_sec) / line_count.max(1) as f64;
    Duration::from_secs_f64(per_line / effective_speed(speed_multiplier))
}
