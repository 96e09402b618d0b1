use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::error::MergeError;
use crate::shared::frame_rate::FrameRate;
use crate::shared::uniform_value::UniformBindings;
use crate::video::domain::segment::SegmentKind;

const DEFAULT_TRANSITION_SECONDS: f64 = 1.0;

fn default_transition_seconds() -> f64 {
    DEFAULT_TRANSITION_SECONDS
}

/// One merge as handed over by the request layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub video_a: PathBuf,
    pub video_b: PathBuf,
    /// Catalog identifier, with or without the `.glsl` extension.
    pub shader: String,
    #[serde(default = "default_transition_seconds")]
    pub transition_seconds: f64,
    /// Extra uniforms; names the program does not declare are ignored.
    #[serde(default)]
    pub uniforms: UniformBindings,
    pub output: PathBuf,
}

impl MergeRequest {
    pub fn new(
        video_a: impl Into<PathBuf>,
        video_b: impl Into<PathBuf>,
        shader: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            video_a: video_a.into(),
            video_b: video_b.into(),
            shader: shader.into(),
            transition_seconds: DEFAULT_TRANSITION_SECONDS,
            uniforms: UniformBindings::new(),
            output: output.into(),
        }
    }

    pub fn with_transition_seconds(mut self, seconds: f64) -> Self {
        self.transition_seconds = seconds;
        self
    }

    pub fn with_uniforms(mut self, uniforms: UniformBindings) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if !self.transition_seconds.is_finite() || self.transition_seconds < 0.0 {
            return Err(MergeError::InvalidRequest(format!(
                "transition duration must be a non-negative number of seconds, got {}",
                self.transition_seconds
            )));
        }
        if self.shader.trim().is_empty() {
            return Err(MergeError::InvalidRequest("no shader given".to_string()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(MergeError::InvalidRequest("no output path given".to_string()));
        }
        if self.output == self.video_a || self.output == self.video_b {
            return Err(MergeError::InvalidRequest(format!(
                "output {} would overwrite an input",
                self.output.display()
            )));
        }
        Ok(())
    }
}

/// What a successful merge produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub output: PathBuf,
    pub frame_rate: FrameRate,
    pub transition_frames: usize,
    pub pre_frames: usize,
    pub post_frames: usize,
    /// Segment kinds in concatenation order; empty kinds are absent.
    pub segments: Vec<SegmentKind>,
}

impl MergeOutcome {
    pub fn total_frames(&self) -> usize {
        self.pre_frames + self.transition_frames + self.post_frames
    }
}
