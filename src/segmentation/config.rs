/// Configuration for splitting segment bodies into display lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentationConfig {
    /// Maximum characters per line; a single longer word still gets its own line
    pub target_width: usize,
}

impl SegmentationConfig {
    pub fn with_width(target_width: usize) -> Self {
        Self {
            target_width: target_width.max(1),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self { target_width: 65 }
    }
}
