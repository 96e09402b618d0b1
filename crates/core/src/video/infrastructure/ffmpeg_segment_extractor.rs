use std::path::Path;

use crate::shared::constants::{frame_file_name, FRAME_FILE_PATTERN};
use crate::shared::error::MergeError;
use crate::shared::frame::Frame;
use crate::shared::frame_rate::FrameRate;
use crate::shared::video_stream::VideoStream;
use crate::video::domain::segment_extractor::SegmentExtractor;

use super::ffmpeg_tool::FfmpegTool;
use super::frame_images::load_frame;

/// Extracts segments and raw frame windows with the ffmpeg CLI.
///
/// Segments are cut by time (`start / rate`, `count / rate`); frame windows
/// are selected by decoded frame index so the blend window is exact.
pub struct FfmpegSegmentExtractor {
    tool: FfmpegTool,
}

impl FfmpegSegmentExtractor {
    pub fn new(tool: FfmpegTool) -> Self {
        Self { tool }
    }
}

impl SegmentExtractor for FfmpegSegmentExtractor {
    fn extract_segment(
        &self,
        source: &VideoStream,
        start_frame: usize,
        frame_count: usize,
        output_rate: FrameRate,
        out_path: &Path,
    ) -> Result<(), MergeError> {
        if frame_count == 0 {
            return Err(MergeError::Extraction(
                "refusing to extract an empty segment".to_string(),
            ));
        }

        let start_time = source.time_of(start_frame);
        let duration = source.frame_rate.frames_to_seconds(frame_count);
        log::debug!(
            "Extracting {frame_count} frames from {} at {start_time:.3}s into {}",
            source.path.display(),
            out_path.display()
        );

        let mut args = vec![
            "-ss".to_string(),
            format!("{start_time:.6}"),
            "-i".into(),
            source.path.display().to_string(),
            "-t".into(),
            format!("{duration:.6}"),
            "-vf".into(),
            format!("{},setsar=1", self.tool.scale_filter()),
            "-r".into(),
            output_rate.to_string(),
        ];
        args.extend(self.tool.h264_args());
        args.push(out_path.display().to_string());

        self.tool.run(args, MergeError::Extraction)
    }

    fn extract_frames(
        &self,
        source: &VideoStream,
        start_frame: usize,
        frame_count: usize,
        scratch_root: &Path,
    ) -> Result<Vec<Frame>, MergeError> {
        if frame_count == 0 {
            return Ok(Vec::new());
        }

        let scratch = tempfile::Builder::new()
            .prefix("extract-")
            .tempdir_in(scratch_root)
            .map_err(|e| {
                MergeError::Extraction(format!(
                    "cannot create scratch directory in {}: {e}",
                    scratch_root.display()
                ))
            })?;

        let last_frame = start_frame + frame_count - 1;
        let args = vec![
            "-i".to_string(),
            source.path.display().to_string(),
            "-vf".into(),
            format!(
                "select=between(n\\,{start_frame}\\,{last_frame}),{}",
                self.tool.scale_filter()
            ),
            "-fps_mode".into(),
            "passthrough".into(),
            "-frames:v".into(),
            frame_count.to_string(),
            scratch.path().join(FRAME_FILE_PATTERN).display().to_string(),
        ];
        self.tool.run(args, MergeError::Extraction)?;

        let mut frames = Vec::with_capacity(frame_count);
        for i in 0..frame_count {
            let path = scratch.path().join(frame_file_name(i));
            if !path.exists() {
                return Err(MergeError::Extraction(format!(
                    "expected {frame_count} frames from {} starting at {start_frame}, got {i}",
                    source.path.display()
                )));
            }
            let frame = load_frame(&path, i, self.tool.resolution()).map_err(|e| {
                MergeError::Extraction(format!("cannot decode {}: {e}", path.display()))
            })?;
            frames.push(frame);
        }

        Ok(frames)
    }
}
