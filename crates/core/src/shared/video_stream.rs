use std::path::PathBuf;

use super::frame_rate::FrameRate;

/// A probed source video. Counts and rate are measured once per job and
/// treated as immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoStream {
    pub path: PathBuf,
    pub frame_count: usize,
    pub frame_rate: FrameRate,
    pub resolution: (u32, u32),
}

impl VideoStream {
    /// Start time in seconds of `frame` at the stream's own rate.
    pub fn time_of(&self, frame: usize) -> f64 {
        self.frame_rate.frames_to_seconds(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_time_of_uses_stream_rate() {
        let stream = VideoStream {
            path: PathBuf::from("/tmp/a.mp4"),
            frame_count: 90,
            frame_rate: FrameRate::from_integer(30).unwrap(),
            resolution: (1920, 1080),
        };
        assert_relative_eq!(stream.time_of(60), 2.0);
        assert_relative_eq!(stream.time_of(0), 0.0);
    }

    #[test]
    fn test_clone_is_equal() {
        let stream = VideoStream {
            path: PathBuf::from("/tmp/b.mp4"),
            frame_count: 100,
            frame_rate: FrameRate::new(24000, 1001).unwrap(),
            resolution: (640, 480),
        };
        assert_eq!(stream.clone(), stream);
    }
}
