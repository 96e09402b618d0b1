use std::thread::JoinHandle;
use std::time::Instant;

use crate::compositing::domain::transition_compositor::TransitionCompositor;
use crate::pipeline::pipeline_logger::{stage, PipelineLogger};
use crate::pipeline::transition_window;
use crate::shared::error::MergeError;
use crate::shared::frame::{Frame, RenderedFrame};
use crate::shared::uniform_value::UniformBindings;
use crate::video::domain::frame_sequence::FrameSequence;
use crate::video::infrastructure::frame_images::save_frame;

const DEFAULT_CHANNEL_CAPACITY: usize = 4;

/// Renders the transition window and writes the frames to disk.
///
/// Rendering happens on the calling thread, which owns the compositor, and a
/// writer thread saves each finished frame as PNG while the next one renders.
pub struct ThreadedTransitionRenderer {
    channel_capacity: usize,
}

impl ThreadedTransitionRenderer {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Renders frame `i` at progress `i / n` from `window_a[i]` and
    /// `window_b[i]`, appending each result to `frames`.
    pub fn render(
        &self,
        compositor: &mut dyn TransitionCompositor,
        window_a: &[Frame],
        window_b: &[Frame],
        uniforms: &UniformBindings,
        frames: FrameSequence,
        logger: &mut dyn PipelineLogger,
    ) -> Result<FrameSequence, MergeError> {
        if window_a.len() != window_b.len() {
            return Err(MergeError::Render(format!(
                "transition windows differ in length ({} vs {})",
                window_a.len(),
                window_b.len()
            )));
        }
        let total = window_a.len();

        let (write_tx, write_rx) = crossbeam_channel::bounded::<RenderedFrame>(self.channel_capacity);
        let writer_handle = spawn_writer(frames, write_rx);

        let mut render_error = None;
        for (i, (frame_a, frame_b)) in window_a.iter().zip(window_b).enumerate() {
            let progress = transition_window::progress(i, total);
            let start = Instant::now();
            let rendered = match compositor.render_frame(progress, frame_a, frame_b, uniforms) {
                Ok(frame) => frame,
                Err(e) => {
                    render_error = Some(e);
                    break;
                }
            };
            logger.timing(stage::RENDER, start.elapsed().as_secs_f64() * 1000.0);
            logger.progress(i + 1, total);

            // A closed channel means the writer failed; its error wins below.
            if write_tx.send(rendered).is_err() {
                break;
            }
        }
        drop(write_tx);

        let written = join_writer(writer_handle);
        match (render_error, written) {
            (Some(e), _) => Err(e),
            (None, Err(e)) => Err(e),
            (None, Ok(frames)) if frames.len() != total => Err(MergeError::Render(format!(
                "wrote {} of {total} transition frames",
                frames.len()
            ))),
            (None, Ok(frames)) => Ok(frames),
        }
    }
}

impl Default for ThreadedTransitionRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_writer(
    mut frames: FrameSequence,
    write_rx: crossbeam_channel::Receiver<RenderedFrame>,
) -> JoinHandle<Result<FrameSequence, MergeError>> {
    std::thread::spawn(move || {
        for frame in write_rx {
            let path = frames.next_path();
            save_frame(&path, &frame).map_err(|e| {
                MergeError::Render(format!("cannot write {}: {e}", path.display()))
            })?;
            frames.commit();
        }
        Ok(frames)
    })
}

fn join_writer(
    handle: JoinHandle<Result<FrameSequence, MergeError>>,
) -> Result<FrameSequence, MergeError> {
    handle
        .join()
        .map_err(|_| MergeError::Render("frame writer thread panicked".to_string()))?
}
