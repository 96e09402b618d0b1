use crate::shared::error::MergeError;
use crate::shared::frame_rate::FrameRate;
use crate::shared::video_stream::VideoStream;

/// Absorbs float error so that e.g. `0.1 * 30` still yields 3 frames.
const FRAME_EPSILON: f64 = 1e-9;

/// The blended span: the last `frame_count` frames of A over the first
/// `frame_count` frames of B.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionWindow {
    pub frame_count: usize,
    pub start_in_a: usize,
    pub start_in_b: usize,
    /// Frames of B after the window.
    pub post_frames: usize,
}

impl TransitionWindow {
    /// Whole frames covered by `seconds` at `rate`.
    pub fn frames_for(seconds: f64, rate: FrameRate) -> Result<usize, MergeError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(MergeError::InvalidRequest(format!(
                "transition duration must be a non-negative number of seconds, got {seconds}"
            )));
        }
        Ok((seconds * rate.as_f64() + FRAME_EPSILON).floor() as usize)
    }

    /// Sizes the window at A's rate. Fails before any work is done when
    /// either stream is shorter than the window.
    pub fn compute(seconds: f64, a: &VideoStream, b: &VideoStream) -> Result<Self, MergeError> {
        let frame_count = Self::frames_for(seconds, a.frame_rate)?;
        if frame_count > a.frame_count.min(b.frame_count) {
            return Err(MergeError::TransitionTooLong {
                requested: frame_count,
                available_a: a.frame_count,
                available_b: b.frame_count,
            });
        }

        Ok(Self {
            frame_count,
            start_in_a: a.frame_count - frame_count,
            start_in_b: 0,
            post_frames: b.frame_count - frame_count,
        })
    }

    /// Frames of A before the window.
    pub fn pre_frames(&self) -> usize {
        self.start_in_a
    }
}

/// Progress of transition frame `index` out of `frame_count`:
/// `index / frame_count`, so the last rendered frame stays below 1.
pub fn progress(index: usize, frame_count: usize) -> f32 {
    if frame_count == 0 {
        return 0.0;
    }
    (index as f64 / frame_count as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::ErrorKind;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use std::path::PathBuf;

    fn stream(frames: usize, num: u32, den: u32) -> VideoStream {
        VideoStream {
            path: PathBuf::from("v.mp4"),
            frame_count: frames,
            frame_rate: FrameRate::new(num, den).unwrap(),
            resolution: (1280, 720),
        }
    }

    #[test]
    fn test_one_second_at_30fps() {
        let window =
            TransitionWindow::compute(1.0, &stream(90, 30, 1), &stream(90, 30, 1)).unwrap();
        assert_eq!(window.frame_count, 30);
        assert_eq!(window.pre_frames(), 60);
        assert_eq!(window.start_in_a, 60);
        assert_eq!(window.start_in_b, 0);
        assert_eq!(window.post_frames, 60);
    }

    #[test]
    fn test_too_long_window() {
        let err = TransitionWindow::compute(4.0, &stream(90, 30, 1), &stream(90, 30, 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransitionTooLong);
        match err {
            MergeError::TransitionTooLong { requested, .. } => assert_eq!(requested, 120),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_shorter_b_limits_window() {
        let err = TransitionWindow::compute(1.0, &stream(90, 30, 1), &stream(20, 30, 1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransitionTooLong);
    }

    #[test]
    fn test_window_equal_to_both_streams() {
        let window =
            TransitionWindow::compute(3.0, &stream(90, 30, 1), &stream(90, 30, 1)).unwrap();
        assert_eq!(window.pre_frames(), 0);
        assert_eq!(window.post_frames, 0);
    }

    #[rstest]
    #[case(0.1, 30, 1, 3)]
    #[case(1.1, 30, 1, 33)]
    #[case(1.0, 30000, 1001, 29)]
    #[case(0.5, 25, 1, 12)]
    #[case(0.0, 30, 1, 0)]
    fn test_frames_for(#[case] seconds: f64, #[case] num: u32, #[case] den: u32, #[case] expected: usize) {
        assert_eq!(
            TransitionWindow::frames_for(seconds, FrameRate::new(num, den).unwrap()).unwrap(),
            expected
        );
    }

    #[test]
    fn test_progress_never_reaches_one() {
        let window =
            TransitionWindow::compute(1.0, &stream(90, 30, 1), &stream(90, 30, 1)).unwrap();
        assert_relative_eq!(progress(0, window.frame_count), 0.0);
        assert_relative_eq!(progress(15, window.frame_count), 0.5);
        assert!(progress(29, window.frame_count) < 1.0);
    }

    #[test]
    fn test_progress_of_empty_window_is_zero() {
        assert_relative_eq!(progress(0, 0), 0.0);
    }

    #[test]
    fn test_negative_duration_is_invalid() {
        let err = TransitionWindow::frames_for(-0.5, FrameRate::from_integer(30).unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
