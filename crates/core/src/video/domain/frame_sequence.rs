use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::shared::constants::{frame_file_name, FRAME_FILE_PATTERN};
use crate::shared::error::MergeError;

/// A private directory of sequentially numbered frame images.
///
/// Owns its directory: dropping the sequence deletes every frame.
pub struct FrameSequence {
    dir: TempDir,
    len: usize,
}

impl FrameSequence {
    pub fn create_in(parent: &Path) -> Result<Self, MergeError> {
        let dir = tempfile::Builder::new()
            .prefix("frames-")
            .tempdir_in(parent)
            .map_err(|e| {
                MergeError::Workspace(format!(
                    "cannot create frame directory in {}: {e}",
                    parent.display()
                ))
            })?;
        Ok(Self { dir, len: 0 })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path the next frame must be written to.
    pub fn next_path(&self) -> PathBuf {
        self.dir.path().join(frame_file_name(self.len))
    }

    /// Records that the frame at [`Self::next_path`] has been written.
    pub fn commit(&mut self) {
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `printf`-style input pattern for the encoder.
    pub fn input_pattern(&self) -> PathBuf {
        self.dir.path().join(FRAME_FILE_PATTERN)
    }
}
