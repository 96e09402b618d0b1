use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread::ScopedJoinHandle;
use std::time::Instant;

use crate::catalog::shader_catalog::ShaderCatalog;
use crate::compositing::domain::transition_compositor::{CompositorFactory, TransitionCompositor};
use crate::shared::error::MergeError;
use crate::shared::frame::Frame;
use crate::shared::frame_rate::FrameRate;
use crate::shared::merge_config::MergeConfig;
use crate::shared::video_stream::VideoStream;
use crate::video::domain::frame_encoder::FrameEncoder;
use crate::video::domain::frame_sequence::FrameSequence;
use crate::video::domain::segment::{Segment, SegmentKind};
use crate::video::domain::segment_assembler::SegmentAssembler;
use crate::video::domain::segment_extractor::SegmentExtractor;
use crate::video::domain::video_prober::VideoProber;

use super::infrastructure::threaded_transition_renderer::ThreadedTransitionRenderer;
use super::job_workspace::JobWorkspace;
use super::merge_request::{MergeOutcome, MergeRequest};
use super::pipeline_logger::{stage, PipelineLogger};
use super::transition_window::TransitionWindow;

/// The collaborators a merge is wired from.
#[derive(Clone)]
pub struct MergeTools {
    pub prober: Arc<dyn VideoProber>,
    pub extractor: Arc<dyn SegmentExtractor>,
    pub encoder: Arc<dyn FrameEncoder>,
    pub assembler: Arc<dyn SegmentAssembler>,
    pub compositors: Arc<dyn CompositorFactory>,
}

/// Merges two videos with a shader transition.
///
/// Each [`MergeJob::run`] owns a fresh workspace and compositor; nothing is
/// shared between runs except the read-only catalog and config.
pub struct MergeJob {
    config: MergeConfig,
    catalog: Arc<ShaderCatalog>,
    tools: MergeTools,
    renderer: ThreadedTransitionRenderer,
}

/// Closes the compositor on every exit path.
struct CompositorGuard(Box<dyn TransitionCompositor>);

impl Deref for CompositorGuard {
    type Target = dyn TransitionCompositor;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl DerefMut for CompositorGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.0
    }
}

impl Drop for CompositorGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Decoded source frames of the blend window, index-aligned.
struct TransitionFrames {
    a: Vec<Frame>,
    b: Vec<Frame>,
}

/// Everything extraction produces for one job.
struct Extracted {
    pre: Option<Segment>,
    post: Option<Segment>,
    window: TransitionFrames,
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn joined<T>(handle: ScopedJoinHandle<'_, Result<T, MergeError>>) -> Result<T, MergeError> {
    handle
        .join()
        .map_err(|_| MergeError::Extraction("extraction thread panicked".to_string()))?
}

impl MergeJob {
    pub fn new(config: MergeConfig, catalog: Arc<ShaderCatalog>, tools: MergeTools) -> Self {
        Self {
            config,
            catalog,
            tools,
            renderer: ThreadedTransitionRenderer::new(),
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn run(
        &self,
        request: &MergeRequest,
        logger: &mut dyn PipelineLogger,
    ) -> Result<MergeOutcome, MergeError> {
        request.validate()?;
        let fragment_source = self.catalog.fragment_source(&request.shader)?;

        let workspace = JobWorkspace::create(self.config.workspace_root.as_deref())?;
        let outcome = self.run_in(&workspace, request, &fragment_source, logger);

        if let Err(e) = workspace.close() {
            log::warn!("{e}");
        }
        outcome
    }

    fn run_in(
        &self,
        workspace: &JobWorkspace,
        request: &MergeRequest,
        fragment_source: &str,
        logger: &mut dyn PipelineLogger,
    ) -> Result<MergeOutcome, MergeError> {
        let start = Instant::now();
        let a = self.tools.prober.probe(&request.video_a)?;
        let b = self.tools.prober.probe(&request.video_b)?;
        logger.timing(stage::PROBE, elapsed_ms(start));

        let window = TransitionWindow::compute(request.transition_seconds, &a, &b)?;
        let output_rate = a.frame_rate;
        logger.info(&format!(
            "Transition of {} frames at {output_rate} fps ({} frames from A, {} from B)",
            window.frame_count,
            window.pre_frames(),
            window.post_frames
        ));
        logger.metric("pre_frames", window.pre_frames() as f64);
        logger.metric("transition_frames", window.frame_count as f64);
        logger.metric("post_frames", window.post_frames as f64);

        let start = Instant::now();
        let extracted = self.extract(workspace, &a, &b, window)?;
        logger.timing(stage::EXTRACT, elapsed_ms(start));

        let transition = if window.frame_count > 0 {
            Some(self.render_transition(
                workspace,
                request,
                fragment_source,
                output_rate,
                extracted.window,
                logger,
            )?)
        } else {
            None
        };

        let segments: Vec<Segment> = [extracted.pre, transition, extracted.post]
            .into_iter()
            .flatten()
            .collect();

        let start = Instant::now();
        let assembled = workspace.assembled_path();
        self.tools
            .assembler
            .concatenate(&segments, workspace.path(), &assembled)?;
        workspace.persist(&assembled, &request.output)?;
        logger.timing(stage::ASSEMBLE, elapsed_ms(start));
        logger.info(&format!("Wrote {}", request.output.display()));

        Ok(MergeOutcome {
            output: request.output.clone(),
            frame_rate: output_rate,
            transition_frames: window.frame_count,
            pre_frames: window.pre_frames(),
            post_frames: window.post_frames,
            segments: segments.iter().map(|s| s.kind).collect(),
        })
    }

    /// Runs the pre/post segment cuts and both raw window extractions
    /// concurrently. The first failure in pipeline order wins.
    fn extract(
        &self,
        workspace: &JobWorkspace,
        a: &VideoStream,
        b: &VideoStream,
        window: TransitionWindow,
    ) -> Result<Extracted, MergeError> {
        let extractor = &*self.tools.extractor;
        let scratch = workspace.path();
        let output_rate = a.frame_rate;
        let pre = Segment {
            kind: SegmentKind::Pre,
            path: workspace.segment_path(SegmentKind::Pre),
            ordinal: 0,
            frame_count: window.pre_frames(),
        };
        let post = Segment {
            kind: SegmentKind::Post,
            path: workspace.segment_path(SegmentKind::Post),
            ordinal: 2,
            frame_count: window.post_frames,
        };
        let (pre_path, post_path) = (pre.path.as_path(), post.path.as_path());

        let (pre_result, post_result, window_a, window_b) = std::thread::scope(|s| {
            let pre_handle = if pre.frame_count > 0 {
                let count = pre.frame_count;
                Some(s.spawn(move || extractor.extract_segment(a, 0, count, output_rate, pre_path)))
            } else {
                None
            };
            let post_handle = if post.frame_count > 0 {
                let count = post.frame_count;
                Some(s.spawn(move || {
                    extractor.extract_segment(b, window.frame_count, count, output_rate, post_path)
                }))
            } else {
                None
            };
            let window_a = s.spawn(move || {
                extractor.extract_frames(a, window.start_in_a, window.frame_count, scratch)
            });
            let window_b = s.spawn(move || {
                extractor.extract_frames(b, window.start_in_b, window.frame_count, scratch)
            });

            (
                pre_handle.map(joined).transpose(),
                post_handle.map(joined).transpose(),
                joined(window_a),
                joined(window_b),
            )
        });

        let pre_done = pre_result?.is_some();
        let post_done = post_result?.is_some();
        Ok(Extracted {
            pre: pre_done.then_some(pre),
            post: post_done.then_some(post),
            window: TransitionFrames {
                a: window_a?,
                b: window_b?,
            },
        })
    }

    fn render_transition(
        &self,
        workspace: &JobWorkspace,
        request: &MergeRequest,
        fragment_source: &str,
        output_rate: FrameRate,
        frames: TransitionFrames,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Segment, MergeError> {
        let frame_count = frames.a.len();

        let start = Instant::now();
        let compositor = self.tools.compositors.create(self.config.resolution())?;
        let mut compositor = CompositorGuard(compositor);
        compositor.load_program(fragment_source)?;
        logger.timing(stage::COMPILE, elapsed_ms(start));

        let sequence = FrameSequence::create_in(workspace.path())?;
        let sequence = self.renderer.render(
            &mut *compositor,
            &frames.a,
            &frames.b,
            &request.uniforms,
            sequence,
            logger,
        )?;
        drop(compositor);
        drop(frames);

        let start = Instant::now();
        let path = workspace.segment_path(SegmentKind::Transition);
        self.tools
            .encoder
            .encode_sequence(sequence, output_rate, &path)?;
        logger.timing(stage::ENCODE, elapsed_ms(start));

        Ok(Segment {
            kind: SegmentKind::Transition,
            path,
            ordinal: 1,
            frame_count,
        })
    }
}
