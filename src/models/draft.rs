use serde::{Deserialize, Serialize};

use super::project::{Segment, DEFAULT_SEGMENT_DURATION_SEC, MIN_SEGMENT_DURATION_SEC};

const MAX_DURATION_DIGITS: usize = 5;

/// Editable form backing the add/edit segment dialog. Fields hold raw user
/// input; nothing is validated until `commit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDraft {
    pub title: String,
    pub duration_text: String,
    pub body: String,
}

impl Default for SegmentDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            duration_text: DEFAULT_SEGMENT_DURATION_SEC.to_string(),
            body: String::new(),
        }
    }
}

impl SegmentDraft {
    pub fn from_segment(segment: &Segment) -> Self {
        Self {
            title: segment.title.clone().unwrap_or_default(),
            duration_text: segment.duration_sec.to_string(),
            body: segment.body.clone(),
        }
    }

    /// Keeps digits only, at most five of them; an emptied field reads "0".
    pub fn set_duration_text(&mut self, input: &str) {
        let digits: String = input
            .chars()
            .filter(char::is_ascii_digit)
            .take(MAX_DURATION_DIGITS)
            .collect();
        self.duration_text = if digits.is_empty() { "0".into() } else { digits };
    }

    pub fn duration_sec(&self) -> u32 {
        self.duration_text
            .trim()
            .parse::<u32>()
            .unwrap_or(DEFAULT_SEGMENT_DURATION_SEC)
            .max(MIN_SEGMENT_DURATION_SEC)
    }

    /// Builds the segment to save. Editing keeps the original id and
    /// `createdAt`; a blank title is stored as `None`.
    pub fn commit(&self, existing: Option<&Segment>) -> Segment {
        let title = if self.title.trim().is_empty() {
            None
        } else {
            Some(self.title.clone())
        };

        match existing {
            Some(segment) => Segment {
                title,
                body: self.body.clone(),
                duration_sec: self.duration_sec(),
                ..segment.clone()
            },
            None => Segment::new(title, self.body.clone(), self.duration_sec()),
        }
    }
}
