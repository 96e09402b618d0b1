use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::shared::error::MergeError;
use crate::video::domain::segment::SegmentKind;

const ASSEMBLED_FILE_NAME: &str = "merged.mp4";

/// A job's private scratch directory. Dropping it removes everything inside,
/// on success and failure alike.
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Creates the directory under `root`, or the system temp dir.
    pub fn create(root: Option<&Path>) -> Result<Self, MergeError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("shaderfade-job-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| MergeError::Workspace(format!("cannot create job workspace: {e}")))?;

        log::debug!("Job workspace at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn segment_path(&self, kind: SegmentKind) -> PathBuf {
        self.dir.path().join(kind.file_name())
    }

    pub fn assembled_path(&self) -> PathBuf {
        self.dir.path().join(ASSEMBLED_FILE_NAME)
    }

    /// Moves a finished file out of the workspace. Falls back to copying
    /// when a rename crosses filesystems; a failed copy leaves no file at
    /// `to`.
    pub fn persist(&self, from: &Path, to: &Path) -> Result<(), MergeError> {
        if fs::rename(from, to).is_ok() {
            return Ok(());
        }
        fs::copy(from, to).map(|_| ()).map_err(|e| {
            let _ = fs::remove_file(to);
            MergeError::Workspace(format!(
                "cannot write output {}: {e}",
                to.display()
            ))
        })
    }

    /// Removes the workspace, reporting failures instead of ignoring them.
    pub fn close(self) -> Result<(), MergeError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            MergeError::Workspace(format!("cannot remove workspace {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_under_root_and_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let workspace = JobWorkspace::create(Some(root.path())).unwrap();
        fs::write(workspace.segment_path(SegmentKind::Pre), b"x").unwrap();
        assert!(workspace.path().starts_with(root.path()));
        drop(workspace);
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_close_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let workspace = JobWorkspace::create(Some(root.path())).unwrap();
        let path = workspace.path().to_path_buf();
        workspace.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_persist_moves_file() {
        let root = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let workspace = JobWorkspace::create(Some(root.path())).unwrap();
        let assembled = workspace.assembled_path();
        fs::write(&assembled, b"video").unwrap();

        let out = out_dir.path().join("out.mp4");
        workspace.persist(&assembled, &out).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"video");
        assert!(!assembled.exists());
    }

    #[test]
    fn test_persist_into_missing_directory_fails() {
        let root = tempfile::tempdir().unwrap();
        let workspace = JobWorkspace::create(Some(root.path())).unwrap();
        let assembled = workspace.assembled_path();
        fs::write(&assembled, b"video").unwrap();

        let err = workspace
            .persist(&assembled, Path::new("/nonexistent/dir/out.mp4"))
            .unwrap_err();
        assert!(err.to_string().contains("cannot write output"));
    }

    #[test]
    fn test_missing_root_fails() {
        let err = JobWorkspace::create(Some(Path::new("/nonexistent/root"))).err().unwrap();
        assert!(err.to_string().contains("workspace"));
    }
}
