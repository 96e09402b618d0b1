use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::constants::{
    CANONICAL_HEIGHT, CANONICAL_WIDTH, DEFAULT_CRF, DEFAULT_PRESET, FALLBACK_FRAME_RATE,
};
use super::error::MergeError;

/// Process-wide settings for merge jobs. Loaded once and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub output_width: u32,
    pub output_height: u32,
    /// H.264 CRF used for every encoded segment (0 = lossless, 51 = worst).
    pub crf: u32,
    pub preset: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Parent directory for job workspaces; system temp dir when unset.
    pub workspace_root: Option<PathBuf>,
    pub fallback_frame_rate: u32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            output_width: CANONICAL_WIDTH,
            output_height: CANONICAL_HEIGHT,
            crf: DEFAULT_CRF,
            preset: DEFAULT_PRESET.to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            workspace_root: None,
            fallback_frame_rate: FALLBACK_FRAME_RATE,
        }
    }
}

impl MergeConfig {
    /// Reads a JSON config file; absent fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, MergeError> {
        let json = fs::read_to_string(path).map_err(|e| {
            MergeError::InvalidRequest(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            MergeError::InvalidRequest(format!("invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = crf;
        self
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.crf > 51 {
            return Err(MergeError::InvalidRequest(format!(
                "crf must be between 0 and 51, got {}",
                self.crf
            )));
        }
        if self.output_width == 0 || self.output_height == 0 {
            return Err(MergeError::InvalidRequest(format!(
                "output resolution must be non-zero, got {}x{}",
                self.output_width, self.output_height
            )));
        }
        // yuv420p needs even dimensions
        if self.output_width % 2 != 0 || self.output_height % 2 != 0 {
            return Err(MergeError::InvalidRequest(format!(
                "output resolution must be even, got {}x{}",
                self.output_width, self.output_height
            )));
        }
        if self.fallback_frame_rate == 0 {
            return Err(MergeError::InvalidRequest(
                "fallback_frame_rate must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }
}
