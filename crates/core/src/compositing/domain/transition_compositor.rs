use crate::shared::error::MergeError;
use crate::shared::frame::{Frame, RenderedFrame};
use crate::shared::uniform_value::UniformBindings;

/// Lifecycle of a compositor. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompositorState {
    Uninitialized,
    ContextReady,
    ProgramLoaded,
    Rendering,
    Closed,
}

/// Domain interface for blending two source frames with a transition program.
///
/// One instance serves exactly one job: initialize, load one program,
/// render every transition frame, close. Calls out of that order fail with
/// [`MergeError::Render`].
pub trait TransitionCompositor {
    fn state(&self) -> CompositorState;

    /// Acquires the rendering context.
    fn initialize(&mut self) -> Result<(), MergeError>;

    /// Compiles the fixed vertex stage with `fragment_source`.
    fn load_program(&mut self, fragment_source: &str) -> Result<(), MergeError>;

    /// Whether the loaded program declares the non-opaque uniform `name`.
    fn declares_uniform(&self, name: &str) -> bool;

    /// Renders one blended frame at `progress`. The result carries
    /// `frame_a`'s index.
    fn render_frame(
        &mut self,
        progress: f32,
        frame_a: &Frame,
        frame_b: &Frame,
        uniforms: &UniformBindings,
    ) -> Result<RenderedFrame, MergeError>;

    /// Releases every GPU resource. Safe to call more than once.
    fn close(&mut self);
}

/// Creates a ready compositor per job; contexts are never shared.
pub trait CompositorFactory: Send + Sync {
    fn create(&self, resolution: (u32, u32)) -> Result<Box<dyn TransitionCompositor>, MergeError>;
}
