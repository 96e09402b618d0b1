use std::path::Path;

use crate::shared::error::MergeError;

use super::segment::Segment;

/// Joins segments at the container level, without re-encoding.
pub trait SegmentAssembler: Send + Sync {
    /// `segments` must already be in concatenation order. Scratch files
    /// (e.g. a concat list) go in `scratch_dir`. Fails with
    /// [`MergeError::Assembly`].
    fn concatenate(
        &self,
        segments: &[Segment],
        scratch_dir: &Path,
        out_path: &Path,
    ) -> Result<(), MergeError>;
}
