use std::path::Path;

use crate::shared::error::MergeError;
use crate::shared::frame_rate::FrameRate;
use crate::video::domain::frame_encoder::FrameEncoder;
use crate::video::domain::frame_sequence::FrameSequence;

use super::ffmpeg_tool::FfmpegTool;

/// Encodes a numbered PNG sequence into an H.264 segment.
pub struct FfmpegFrameEncoder {
    tool: FfmpegTool,
}

impl FfmpegFrameEncoder {
    pub fn new(tool: FfmpegTool) -> Self {
        Self { tool }
    }
}

impl FrameEncoder for FfmpegFrameEncoder {
    fn encode_sequence(
        &self,
        frames: FrameSequence,
        frame_rate: FrameRate,
        out_path: &Path,
    ) -> Result<(), MergeError> {
        if frames.is_empty() {
            return Err(MergeError::Encode("no frames to encode".to_string()));
        }

        log::debug!(
            "Encoding {} frames at {frame_rate} into {}",
            frames.len(),
            out_path.display()
        );

        let mut args = vec![
            "-framerate".to_string(),
            frame_rate.to_string(),
            "-i".into(),
            frames.input_pattern().display().to_string(),
            "-vf".into(),
            format!("{},setsar=1", self.tool.scale_filter()),
        ];
        args.extend(self.tool.h264_args());
        args.push(out_path.display().to_string());

        let result = self.tool.run(args, MergeError::Encode);
        drop(frames);
        result
    }
}
