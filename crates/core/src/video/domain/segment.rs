use std::fmt;
use std::path::PathBuf;

/// Position of a segment in the final output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentKind {
    Pre,
    Transition,
    Post,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Pre => "pre",
            SegmentKind::Transition => "transition",
            SegmentKind::Post => "post",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.mp4", self.as_str())
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An independently encoded chunk awaiting stream-copy concatenation.
/// Segments with zero frames are never constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub path: PathBuf,
    pub ordinal: usize,
    pub frame_count: usize,
}

/// Orders segments by ordinal for concatenation.
pub fn in_concat_order(mut segments: Vec<Segment>) -> Vec<Segment> {
    segments.sort_by_key(|s| s.ordinal);
    segments
}
