pub mod algorithm;
pub mod config;

pub use algorithm::{split_into_lines, timed_line_count};
pub use config::SegmentationConfig;
