pub mod draft;
pub mod project;

pub use draft::SegmentDraft;
pub use project::{format_duration, now_millis, Project, Segment};
