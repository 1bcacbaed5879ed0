//! Script data models.
//!
//! `Project` is the unit of persistence; its `segments` order is the playback
//! order. The JSON shape is camelCase to stay compatible with files written by
//! earlier builds of the app.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const DEFAULT_PROJECT_NAME: &str = "Untitled";
pub const DEFAULT_SEGMENT_DURATION_SEC: u32 = 60;
pub const MIN_SEGMENT_DURATION_SEC: u32 = 1;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn new_segment_id() -> String {
    Uuid::new_v4().to_string()
}

/// Reads any integer duration and pulls it into `1..=u32::MAX`, so a single
/// bad value does not reject the whole file.
fn clamped_duration<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(i64::from(MIN_SEGMENT_DURATION_SEC), i64::from(u32::MAX)) as u32)
}

fn default_project_name() -> String {
    DEFAULT_PROJECT_NAME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default = "new_segment_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub body: String,
    #[serde(deserialize_with = "clamped_duration")]
    pub duration_sec: u32,
    #[serde(default = "now_millis")]
    pub created_at: i64,
    #[serde(default = "now_millis")]
    pub updated_at: i64,
}

impl Segment {
    pub fn new(title: Option<String>, body: impl Into<String>, duration_sec: u32) -> Self {
        let now = now_millis();
        Self {
            id: new_segment_id(),
            title,
            body: body.into(),
            duration_sec: duration_sec.max(MIN_SEGMENT_DURATION_SEC),
            created_at: now,
            updated_at: now,
        }
    }

    /// Blank segment added from the builder screen.
    pub fn empty() -> Self {
        Self::new(Some(String::new()), "", DEFAULT_SEGMENT_DURATION_SEC)
    }

    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }

    /// Title shown in the player, falling back to the 1-based position.
    pub fn display_title(&self, index: usize) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Segment {}", index + 1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "now_millis")]
    pub updated_at: i64,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            updated_at: now_millis(),
            segments: Vec::new(),
        }
    }
}

impl Project {
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.segments.iter().position(|segment| segment.id == id)
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn total_duration_sec(&self) -> u64 {
        self.segments
            .iter()
            .map(|segment| u64::from(segment.duration_sec))
            .sum()
    }

    /// Inserts `segment` at the end when its id is unseen, otherwise replaces
    /// the existing entry in place. `updatedAt` is always refreshed.
    pub fn upserted(&self, segment: Segment, now: i64) -> Project {
        let mut segments = self.segments.clone();
        let mut segment = segment;
        segment.duration_sec = segment.duration_sec.max(MIN_SEGMENT_DURATION_SEC);

        match self.position_of(&segment.id) {
            Some(idx) => {
                segment.updated_at = now.max(segments[idx].updated_at);
                segments[idx] = segment;
            }
            None => {
                segment.updated_at = now.max(segment.updated_at);
                segments.push(segment);
            }
        }

        self.with_segments(segments, now)
    }

    /// Returns `None` when no segment carries `id`.
    pub fn without(&self, id: &str, now: i64) -> Option<Project> {
        let idx = self.position_of(id)?;
        let mut segments = self.segments.clone();
        segments.remove(idx);
        Some(self.with_segments(segments, now))
    }

    /// Swaps the segment with its predecessor. `None` at the top or when absent.
    pub fn moved_up(&self, id: &str, now: i64) -> Option<Project> {
        let idx = self.position_of(id)?;
        if idx == 0 {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.swap(idx, idx - 1);
        Some(self.with_segments(segments, now))
    }

    /// Swaps the segment with its successor. `None` at the bottom or when absent.
    pub fn moved_down(&self, id: &str, now: i64) -> Option<Project> {
        let idx = self.position_of(id)?;
        if idx + 1 >= self.segments.len() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.swap(idx, idx + 1);
        Some(self.with_segments(segments, now))
    }

    pub fn renamed(&self, name: impl Into<String>, now: i64) -> Project {
        Project {
            project_name: name.into(),
            updated_at: now.max(self.updated_at),
            segments: self.segments.clone(),
        }
    }

    /// Repairs data read from disk or an imported file: durations below the
    /// minimum are raised and duplicate ids are re-issued.
    pub fn normalized(mut self) -> Project {
        let mut seen = HashSet::with_capacity(self.segments.len());
        for segment in &mut self.segments {
            segment.duration_sec = segment.duration_sec.max(MIN_SEGMENT_DURATION_SEC);
            if !seen.insert(segment.id.clone()) {
                let fresh = new_segment_id();
                log::warn!("duplicate segment id {} re-issued as {}", segment.id, fresh);
                segment.id = fresh.clone();
                seen.insert(fresh);
            }
        }
        self
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Project> {
        serde_json::from_str::<Project>(raw).map(Project::normalized)
    }

    fn with_segments(&self, segments: Vec<Segment>, now: i64) -> Project {
        Project {
            project_name: self.project_name.clone(),
            updated_at: now.max(self.updated_at),
            segments,
        }
    }
}

/// Formats seconds as `m:ss`.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
