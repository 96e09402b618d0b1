use std::fmt;

/// A frame rate kept as an exact, reduced rational (`30000/1001`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRate {
    num: u32,
    den: u32,
}

impl FrameRate {
    /// Returns `None` for a zero numerator or denominator.
    pub fn new(num: u32, den: u32) -> Option<Self> {
        if num == 0 || den == 0 {
            return None;
        }
        let g = gcd(num, den);
        Some(Self {
            num: num / g,
            den: den / g,
        })
    }

    pub fn from_integer(fps: u32) -> Option<Self> {
        Self::new(fps, 1)
    }

    /// Approximates a floating rate to millihertz precision.
    pub fn from_f64(fps: f64) -> Option<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return None;
        }
        let milli = (fps * 1000.0).round();
        if milli < 1.0 || milli > u32::MAX as f64 {
            return None;
        }
        Self::new(milli as u32, 1000)
    }

    /// Parses ffprobe's `num/den` notation; plain numbers are accepted too.
    /// `0/0` (ffprobe's "unknown") yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        match text.split_once('/') {
            Some((n, d)) => Self::new(n.trim().parse().ok()?, d.trim().parse().ok()?),
            None => Self::from_f64(text.parse().ok()?),
        }
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn den(&self) -> u32 {
        self.den
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Seconds covered by `frames` frames at this rate.
    pub fn frames_to_seconds(&self, frames: usize) -> f64 {
        frames as f64 * self.den as f64 / self.num as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
