use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::shared::error::MergeError;
use crate::shared::frame_rate::FrameRate;
use crate::shared::video_stream::VideoStream;
use crate::video::domain::command_runner::CommandRunner;
use crate::video::domain::frame_counter::FrameCounter;
use crate::video::domain::video_prober::VideoProber;

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_packets: Option<String>,
}

/// Probes with `ffprobe` and falls back to a full decode when ffprobe is
/// missing, fails, or reports something unusable.
///
/// The fallback measures the rate from the decode itself; the configured
/// fallback rate is only used when the decode cannot establish one.
pub struct FfprobeProber {
    runner: Arc<dyn CommandRunner>,
    ffprobe_path: String,
    fallback: Box<dyn FrameCounter>,
    fallback_rate: FrameRate,
}

impl FfprobeProber {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        ffprobe_path: impl Into<String>,
        fallback: Box<dyn FrameCounter>,
        fallback_rate: FrameRate,
    ) -> Self {
        Self {
            runner,
            ffprobe_path: ffprobe_path.into(),
            fallback,
            fallback_rate,
        }
    }

    fn probe_with_ffprobe(&self, path: &Path) -> Result<VideoStream, String> {
        let args = [
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,nb_read_packets",
            "-of",
            "json",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(path.display().to_string()))
        .collect::<Vec<_>>();

        let output = self
            .runner
            .run(&self.ffprobe_path, &args)
            .map_err(|e| format!("cannot run {}: {e}", self.ffprobe_path))?;
        if !output.success {
            return Err(format!(
                "ffprobe exited with {:?}: {}",
                output.code,
                crate::shared::error::stderr_excerpt(&output.stderr)
            ));
        }

        parse_probe_output(path, &output.stdout)
    }

    fn probe_by_decoding(&self, path: &Path) -> Result<VideoStream, MergeError> {
        let decoded = self.fallback.count_frames(path)?;
        if decoded.frame_count == 0 {
            return Err(MergeError::probe(path, "no decodable video frames"));
        }

        let frame_rate = match decoded.frame_rate {
            Some(rate) => rate,
            None => {
                log::warn!(
                    "Could not measure frame rate of {}; assuming {} fps",
                    path.display(),
                    self.fallback_rate
                );
                self.fallback_rate
            }
        };

        Ok(VideoStream {
            path: path.to_path_buf(),
            frame_count: decoded.frame_count,
            frame_rate,
            resolution: decoded.resolution,
        })
    }
}

impl VideoProber for FfprobeProber {
    fn probe(&self, path: &Path) -> Result<VideoStream, MergeError> {
        match self.probe_with_ffprobe(path) {
            Ok(stream) => {
                log::debug!(
                    "Probed {}: {} frames @ {} fps, {}x{}",
                    path.display(),
                    stream.frame_count,
                    stream.frame_rate,
                    stream.resolution.0,
                    stream.resolution.1
                );
                Ok(stream)
            }
            Err(reason) => {
                log::warn!(
                    "ffprobe unusable for {} ({reason}); counting frames by full decode",
                    path.display()
                );
                self.probe_by_decoding(path)
            }
        }
    }
}

fn parse_probe_output(path: &Path, stdout: &[u8]) -> Result<VideoStream, String> {
    let parsed: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| format!("unparseable ffprobe output: {e}"))?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or("no video stream reported")?;

    let frame_count = [&stream.nb_frames, &stream.nb_read_packets]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .filter_map(|text| text.trim().parse::<usize>().ok())
        .find(|&n| n > 0)
        .ok_or("no frame count reported")?;

    let frame_rate = [&stream.r_frame_rate, &stream.avg_frame_rate]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .find_map(FrameRate::parse)
        .ok_or("no frame rate reported")?;

    let resolution = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("no resolution reported".to_string()),
    };

    Ok(VideoStream {
        path: path.to_path_buf(),
        frame_count,
        frame_rate,
        resolution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::ErrorKind;
    use crate::test_support::RecordingRunner;
    use crate::video::domain::command_runner::CommandOutput;
    use crate::video::domain::frame_counter::DecodedCount;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubCounter {
        result: Result<DecodedCount, String>,
        calls: Arc<AtomicUsize>,
    }

    impl StubCounter {
        fn counting(frames: usize, rate: Option<FrameRate>) -> Self {
            Self {
                result: Ok(DecodedCount {
                    frame_count: frames,
                    frame_rate: rate,
                    resolution: (640, 360),
                }),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err("cannot open".to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FrameCounter for StubCounter {
        fn count_frames(&self, path: &Path) -> Result<DecodedCount, MergeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .map_err(|message| MergeError::probe(path, message))
        }
    }

    const FFPROBE_JSON: &str = r#"{
        "programs": [],
        "streams": [{
            "width": 1920,
            "height": 1080,
            "r_frame_rate": "30000/1001",
            "avg_frame_rate": "30000/1001",
            "nb_frames": "90",
            "nb_read_packets": "90"
        }]
    }"#;

    fn prober(runner: RecordingRunner, counter: StubCounter) -> FfprobeProber {
        FfprobeProber::new(
            Arc::new(runner),
            "ffprobe",
            Box::new(counter),
            FrameRate::from_integer(30).unwrap(),
        )
    }

    #[test]
    fn test_primary_path_parses_ffprobe_json() {
        let runner = RecordingRunner::new(|_, _| Ok(CommandOutput::ok(FFPROBE_JSON)));
        let counter = StubCounter::counting(1, None);
        let calls = counter.calls.clone();
        let stream = prober(runner, counter).probe(Path::new("a.mp4")).unwrap();

        assert_eq!(stream.frame_count, 90);
        assert_eq!(stream.frame_rate, FrameRate::new(30000, 1001).unwrap());
        assert_relative_eq!(stream.frame_rate.as_f64(), 29.97002997, epsilon = 1e-6);
        assert_eq!(stream.resolution, (1920, 1080));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invokes_ffprobe_on_first_video_stream() {
        let runner = RecordingRunner::new(|_, _| Ok(CommandOutput::ok(FFPROBE_JSON)));
        let calls = runner.calls();
        prober(runner, StubCounter::counting(1, None))
            .probe(Path::new("/videos/a.mp4"))
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (program, args) = &calls[0];
        assert_eq!(program, "ffprobe");
        assert!(args.windows(2).any(|w| w[0] == "-select_streams" && w[1] == "v:0"));
        assert_eq!(args.last().unwrap(), "/videos/a.mp4");
    }

    #[test]
    fn test_nb_read_packets_used_when_nb_frames_missing() {
        let json = r#"{"streams": [{"width": 1280, "height": 720,
            "r_frame_rate": "25/1", "nb_frames": "N/A", "nb_read_packets": "250"}]}"#;
        let runner = RecordingRunner::new(move |_, _| Ok(CommandOutput::ok(json)));
        let stream = prober(runner, StubCounter::counting(1, None))
            .probe(Path::new("a.mp4"))
            .unwrap();
        assert_eq!(stream.frame_count, 250);
        assert_eq!(stream.frame_rate, FrameRate::from_integer(25).unwrap());
    }

    #[test]
    fn test_falls_back_when_ffprobe_missing() {
        let runner = RecordingRunner::new(|_, _| {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no ffprobe"))
        });
        let counter = StubCounter::counting(48, FrameRate::from_integer(24));
        let calls = counter.calls.clone();
        let stream = prober(runner, counter).probe(Path::new("a.mp4")).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stream.frame_count, 48);
        assert_eq!(stream.frame_rate, FrameRate::from_integer(24).unwrap());
        assert_eq!(stream.resolution, (640, 360));
    }

    #[test]
    fn test_falls_back_on_unparseable_output() {
        let runner = RecordingRunner::new(|_, _| Ok(CommandOutput::ok("not json")));
        let counter = StubCounter::counting(10, FrameRate::from_integer(60));
        let calls = counter.calls.clone();
        prober(runner, counter).probe(Path::new("a.mp4")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_falls_back_on_nonzero_exit() {
        let runner = RecordingRunner::new(|_, _| Ok(CommandOutput::failed(1, "moov atom not found")));
        let counter = StubCounter::counting(10, FrameRate::from_integer(60));
        let calls = counter.calls.clone();
        prober(runner, counter).probe(Path::new("a.mp4")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fallback_without_measured_rate_uses_configured_rate() {
        let runner = RecordingRunner::new(|_, _| Ok(CommandOutput::ok("{}")));
        let stream = prober(runner, StubCounter::counting(10, None))
            .probe(Path::new("a.mp4"))
            .unwrap();
        assert_eq!(stream.frame_rate, FrameRate::from_integer(30).unwrap());
    }

    #[test]
    fn test_unopenable_file_is_probe_error() {
        let runner = RecordingRunner::new(|_, _| Ok(CommandOutput::failed(1, "No such file")));
        let err = prober(runner, StubCounter::failing())
            .probe(Path::new("missing.mp4"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Probe);
    }

    #[test]
    fn test_zero_decoded_frames_is_probe_error() {
        let runner = RecordingRunner::new(|_, _| Ok(CommandOutput::ok("{}")));
        let err = prober(runner, StubCounter::counting(0, None))
            .probe(Path::new("empty.mp4"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Probe);
    }

    #[test]
    fn test_parse_rejects_unknown_rate() {
        let json = br#"{"streams": [{"width": 2, "height": 2, "r_frame_rate": "0/0",
            "avg_frame_rate": "0/0", "nb_frames": "3"}]}"#;
        assert!(parse_probe_output(Path::new("a.mp4"), json).is_err());
    }
}
