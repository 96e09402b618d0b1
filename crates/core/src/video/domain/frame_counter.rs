use std::path::Path;

use crate::shared::error::MergeError;
use crate::shared::frame_rate::FrameRate;

/// Result of a full decode pass over a video.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedCount {
    pub frame_count: usize,
    /// `None` when the decode could not establish a rate on its own.
    pub frame_rate: Option<FrameRate>,
    pub resolution: (u32, u32),
}

/// Slow but dependable probing path: decodes every frame and counts.
pub trait FrameCounter: Send + Sync {
    fn count_frames(&self, path: &Path) -> Result<DecodedCount, MergeError>;
}
