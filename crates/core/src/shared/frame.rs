/// A single decoded or rendered frame: contiguous RGB bytes in row-major
/// order, top row first.
///
/// Format conversion happens at I/O boundaries only; the pipeline treats
/// pixel data as opaque.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

/// Frames produced by the compositor share the decoded frame layout.
pub type RenderedFrame = Frame;

pub const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// A frame filled with one RGB colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * CHANNELS)
            .collect();
        Self::new(data, width, height, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// RGB pixel at `(x, y)`, `y` counted from the top row.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Expands to RGBA with opaque alpha, emitting rows bottom-up.
    ///
    /// Texture uploads use this so that texture coordinate `v = 0` addresses
    /// the bottom row, matching the GL convention shaders are written for.
    pub fn to_rgba_bottom_up(&self) -> Vec<u8> {
        let row_len = self.width as usize * CHANNELS;
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for row in self.data.chunks_exact(row_len).rev() {
            for px in row.chunks_exact(CHANNELS) {
                out.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
        out
    }
}
