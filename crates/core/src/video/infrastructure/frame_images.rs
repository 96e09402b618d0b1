use std::path::Path;

use crate::shared::frame::Frame;

/// Loads an image file as a [`Frame`], resizing to `size` when it differs.
pub fn load_frame(
    path: &Path,
    index: usize,
    size: (u32, u32),
) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_rgb8();

    let img = if img.dimensions() != size {
        image::imageops::resize(&img, size.0, size.1, image::imageops::FilterType::Triangle)
    } else {
        img
    };

    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, index))
}

/// Writes a frame as an image; the format follows the file extension.
pub fn save_frame(path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
    let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("Failed to create image from frame data")?;
    img.save(path)?;
    Ok(())
}
