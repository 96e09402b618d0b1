use std::sync::Arc;

use crate::shared::constants::TRACK_TIMESCALE;
use crate::shared::error::{stderr_excerpt, MergeError};
use crate::shared::merge_config::MergeConfig;
use crate::video::domain::command_runner::CommandRunner;

/// The `ffmpeg` binary plus the encode settings every produced segment
/// shares. Identical codec, pixel format and time base across segments is
/// what lets the final concatenation run as a stream copy.
#[derive(Clone)]
pub struct FfmpegTool {
    runner: Arc<dyn CommandRunner>,
    program: String,
    crf: u32,
    preset: String,
    resolution: (u32, u32),
}

impl FfmpegTool {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &MergeConfig) -> Self {
        Self {
            runner,
            program: config.ffmpeg_path.clone(),
            crf: config.crf,
            preset: config.preset.clone(),
            resolution: config.resolution(),
        }
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    /// `scale=W:H` filter to the canonical resolution.
    pub fn scale_filter(&self) -> String {
        format!("scale={}:{}", self.resolution.0, self.resolution.1)
    }

    /// Video encode arguments shared by every segment.
    pub fn h264_args(&self) -> Vec<String> {
        vec![
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            self.preset.clone(),
            "-crf".into(),
            self.crf.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-video_track_timescale".into(),
            TRACK_TIMESCALE.to_string(),
            "-an".into(),
        ]
    }

    /// Runs ffmpeg with `-y -v error` prepended; spawn failures and nonzero
    /// exits are turned into the caller's error kind.
    pub fn run(
        &self,
        args: Vec<String>,
        to_error: fn(String) -> MergeError,
    ) -> Result<(), MergeError> {
        let mut full = vec!["-y".to_string(), "-v".into(), "error".into()];
        full.extend(args);

        let output = self
            .runner
            .run(&self.program, &full)
            .map_err(|e| to_error(format!("cannot run {}: {e}", self.program)))?;

        if !output.success {
            return Err(to_error(format!(
                "{} exited with {}: {}",
                self.program,
                output
                    .code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr_excerpt(&output.stderr)
            )));
        }
        Ok(())
    }
}
