use std::path::Path;

use crate::shared::error::MergeError;
use crate::shared::frame_rate::FrameRate;
use crate::video::domain::frame_counter::{DecodedCount, FrameCounter};

/// Counts frames by decoding the whole video stream via ffmpeg-next
/// (libavformat + libavcodec).
///
/// The rate comes from the decoded presentation timestamps when at least
/// two frames carry them, otherwise from the stream's average rate.
pub struct FfmpegFrameCounter;

impl FfmpegFrameCounter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegFrameCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCounter for FfmpegFrameCounter {
    fn count_frames(&self, path: &Path) -> Result<DecodedCount, MergeError> {
        decode_and_count(path).map_err(|e| MergeError::probe(path, e.to_string()))
    }
}

fn decode_and_count(path: &Path) -> Result<DecodedCount, Box<dyn std::error::Error>> {
    ffmpeg_next::init()?;

    let mut ictx = ffmpeg_next::format::input(path)?;

    let stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or("No video stream found")?;

    let video_stream_index = stream.index();
    let time_base = stream.time_base();
    let avg_rate = stream.avg_frame_rate();
    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    let mut decoder = codec_ctx.decoder().video()?;
    let resolution = (decoder.width(), decoder.height());

    let mut span = TimestampSpan::default();
    let mut decoded = ffmpeg_next::util::frame::video::Video::empty();

    for (stream, packet) in ictx.packets() {
        if stream.index() != video_stream_index {
            continue;
        }
        if decoder.send_packet(&packet).is_err() {
            continue;
        }
        while decoder.receive_frame(&mut decoded).is_ok() {
            span.record(decoded.timestamp());
        }
    }

    decoder.send_eof()?;
    while decoder.receive_frame(&mut decoded).is_ok() {
        span.record(decoded.timestamp());
    }

    let seconds_per_tick = if time_base.denominator() != 0 {
        time_base.numerator() as f64 / time_base.denominator() as f64
    } else {
        0.0
    };
    let frame_rate = span.rate(seconds_per_tick).or_else(|| {
        u32::try_from(avg_rate.numerator())
            .ok()
            .zip(u32::try_from(avg_rate.denominator()).ok())
            .and_then(|(num, den)| FrameRate::new(num, den))
    });

    Ok(DecodedCount {
        frame_count: span.count,
        frame_rate,
        resolution,
    })
}

/// Tracks decoded frame count and the presentation-timestamp range.
#[derive(Default)]
struct TimestampSpan {
    count: usize,
    timestamped: usize,
    first: Option<i64>,
    last: Option<i64>,
}

impl TimestampSpan {
    fn record(&mut self, pts: Option<i64>) {
        self.count += 1;
        if let Some(pts) = pts {
            self.timestamped += 1;
            self.first = Some(self.first.map_or(pts, |f| f.min(pts)));
            self.last = Some(self.last.map_or(pts, |l| l.max(pts)));
        }
    }

    /// Average rate over the timestamp span: `(n - 1)` intervals between
    /// the first and last presentation time.
    fn rate(&self, seconds_per_tick: f64) -> Option<FrameRate> {
        let (first, last) = (self.first?, self.last?);
        if self.timestamped < 2 || last <= first || seconds_per_tick <= 0.0 {
            return None;
        }
        let seconds = (last - first) as f64 * seconds_per_tick;
        FrameRate::from_f64((self.timestamped - 1) as f64 / seconds)
    }
}
