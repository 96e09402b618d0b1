use std::path::Path;

use crate::shared::error::MergeError;
use crate::shared::frame::Frame;
use crate::shared::frame_rate::FrameRate;
use crate::shared::video_stream::VideoStream;

/// Pulls frame ranges out of a probed source video.
///
/// Both operations scale to the canonical output resolution. Failures are
/// reported as [`MergeError::Extraction`]; partial output must not be used.
pub trait SegmentExtractor: Send + Sync {
    /// Re-encodes `frame_count` frames starting at `start_frame` into a
    /// standalone file at `out_path`, resampled to `output_rate`.
    fn extract_segment(
        &self,
        source: &VideoStream,
        start_frame: usize,
        frame_count: usize,
        output_rate: FrameRate,
        out_path: &Path,
    ) -> Result<(), MergeError>;

    /// Decodes exactly `frame_count` frames starting at `start_frame`.
    ///
    /// Any scratch files live under `scratch_root` and are gone when this
    /// returns, whatever the outcome.
    fn extract_frames(
        &self,
        source: &VideoStream,
        start_frame: usize,
        frame_count: usize,
        scratch_root: &Path,
    ) -> Result<Vec<Frame>, MergeError>;
}
