/// Canonical output resolution every segment is scaled to.
pub const CANONICAL_WIDTH: u32 = 1280;
pub const CANONICAL_HEIGHT: u32 = 720;

/// Rate assumed only when neither probing path can measure one.
pub const FALLBACK_FRAME_RATE: u32 = 30;

/// H.264 constant-quality setting shared by every encoded segment.
pub const DEFAULT_CRF: u32 = 18;
pub const DEFAULT_PRESET: &str = "veryfast";

/// Shared MP4 track timescale so stream-copy concatenation sees one time base.
pub const TRACK_TIMESCALE: u32 = 90_000;

pub const SHADER_EXTENSION: &str = "glsl";
pub const SHADER_CONFIG_FILENAME: &str = "shader_config.json";

/// Numbered image pattern shared by frame export and frame encoding.
pub const FRAME_FILE_PATTERN: &str = "frame_%05d.png";

/// Uniforms populated by the compositor itself.
pub const FROM_SAMPLER: &str = "from";
pub const TO_SAMPLER: &str = "to";
pub const PROGRESS_UNIFORM: &str = "progress";
pub const RESOLUTION_UNIFORM: &str = "resolution";

/// File name for the `index`-th numbered frame (`index` is zero-based).
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:05}.png", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_file_name_is_one_based() {
        assert_eq!(frame_file_name(0), "frame_00001.png");
        assert_eq!(frame_file_name(41), "frame_00042.png");
    }
}
