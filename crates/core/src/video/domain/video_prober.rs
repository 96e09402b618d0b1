use std::path::Path;

use crate::shared::error::MergeError;
use crate::shared::video_stream::VideoStream;

/// Measures frame count, frame rate and resolution of a source video.
///
/// Fails only with [`MergeError::Probe`].
pub trait VideoProber: Send + Sync {
    fn probe(&self, path: &Path) -> Result<VideoStream, MergeError>;
}
