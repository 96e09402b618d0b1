use std::path::Path;

use crate::shared::error::MergeError;
use crate::shared::frame_rate::FrameRate;

use super::frame_sequence::FrameSequence;

/// Turns rendered frames into a video segment compatible with the
/// extracted segments (same codec, pixel format and time base).
pub trait FrameEncoder: Send + Sync {
    /// Consumes the sequence so its directory is deleted on every path.
    /// Fails with [`MergeError::Encode`].
    fn encode_sequence(
        &self,
        frames: FrameSequence,
        frame_rate: FrameRate,
        out_path: &Path,
    ) -> Result<(), MergeError>;
}
