use std::fs;
use std::path::Path;

use crate::shared::error::MergeError;
use crate::video::domain::segment::{in_concat_order, Segment};
use crate::video::domain::segment_assembler::SegmentAssembler;

use super::ffmpeg_tool::FfmpegTool;

const LIST_FILE_NAME: &str = "concat.txt";

/// Joins segments with ffmpeg's concat demuxer as a stream copy.
pub struct FfmpegConcatAssembler {
    tool: FfmpegTool,
}

impl FfmpegConcatAssembler {
    pub fn new(tool: FfmpegTool) -> Self {
        Self { tool }
    }
}

/// One `file '<path>'` line per segment. Single quotes inside paths are
/// closed, escaped and reopened as the concat demuxer expects.
fn concat_list(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| {
            let path = s.path.display().to_string().replace('\'', "'\\''");
            format!("file '{path}'\n")
        })
        .collect()
}

impl SegmentAssembler for FfmpegConcatAssembler {
    fn concatenate(
        &self,
        segments: &[Segment],
        scratch_dir: &Path,
        out_path: &Path,
    ) -> Result<(), MergeError> {
        if segments.is_empty() {
            return Err(MergeError::Assembly("no segments to concatenate".to_string()));
        }

        let ordered = in_concat_order(segments.to_vec());
        let list_path = scratch_dir.join(LIST_FILE_NAME);
        fs::write(&list_path, concat_list(&ordered)).map_err(|e| {
            MergeError::Assembly(format!("cannot write {}: {e}", list_path.display()))
        })?;

        log::debug!(
            "Concatenating {} segments into {}",
            ordered.len(),
            out_path.display()
        );

        let args = vec![
            "-f".to_string(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_path.display().to_string(),
            "-c".into(),
            "copy".into(),
            "-movflags".into(),
            "+faststart".into(),
            out_path.display().to_string(),
        ];
        self.tool.run(args, MergeError::Assembly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::ErrorKind;
    use crate::shared::merge_config::MergeConfig;
    use crate::test_support::{arg_after, RecordingRunner};
    use crate::video::domain::command_runner::CommandOutput;
    use crate::video::domain::segment::SegmentKind;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn segment(kind: SegmentKind, ordinal: usize, path: &str) -> Segment {
        Segment {
            kind,
            path: PathBuf::from(path),
            ordinal,
            frame_count: 10,
        }
    }

    fn assembler(runner: RecordingRunner) -> FfmpegConcatAssembler {
        FfmpegConcatAssembler::new(FfmpegTool::new(Arc::new(runner), &MergeConfig::default()))
    }

    #[test]
    fn test_list_is_written_in_ordinal_order() {
        let runner = RecordingRunner::touching_outputs();
        let calls = runner.calls();
        let dir = tempfile::tempdir().unwrap();
        let segments = vec![
            segment(SegmentKind::Post, 2, "/w/post.mp4"),
            segment(SegmentKind::Pre, 0, "/w/pre.mp4"),
            segment(SegmentKind::Transition, 1, "/w/transition.mp4"),
        ];

        assembler(runner)
            .concatenate(&segments, dir.path(), &dir.path().join("out.mp4"))
            .unwrap();

        let list = fs::read_to_string(dir.path().join(LIST_FILE_NAME)).unwrap();
        assert_eq!(
            list,
            "file '/w/pre.mp4'\nfile '/w/transition.mp4'\nfile '/w/post.mp4'\n"
        );

        let calls = calls.lock().unwrap();
        let args = &calls[0].1;
        assert_eq!(arg_after(args, "-f"), Some("concat"));
        assert_eq!(arg_after(args, "-safe"), Some("0"));
        assert_eq!(arg_after(args, "-c"), Some("copy"));
        assert_eq!(arg_after(args, "-movflags"), Some("+faststart"));
    }

    #[test]
    fn test_quotes_in_paths_are_escaped() {
        let list = concat_list(&[segment(SegmentKind::Pre, 0, "/w/it's.mp4")]);
        assert_eq!(list, "file '/w/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_empty_segment_list_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = assembler(RecordingRunner::touching_outputs())
            .concatenate(&[], dir.path(), &dir.path().join("out.mp4"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Assembly);
    }

    #[test]
    fn test_tool_failure_is_assembly_error() {
        let runner = RecordingRunner::new(|_, _| Ok(CommandOutput::failed(1, "Invalid data")));
        let dir = tempfile::tempdir().unwrap();
        let err = assembler(runner)
            .concatenate(
                &[segment(SegmentKind::Pre, 0, "/w/pre.mp4")],
                dir.path(),
                &dir.path().join("out.mp4"),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Assembly);
        assert!(err.to_string().contains("Invalid data"));
    }
}
