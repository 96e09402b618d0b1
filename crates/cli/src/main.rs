use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use shaderfade_core::catalog::shader_catalog::ShaderCatalog;
use shaderfade_core::compositing::infrastructure::gpu_shader_compositor::GpuCompositorFactory;
use shaderfade_core::pipeline::merge_job::{MergeJob, MergeTools};
use shaderfade_core::pipeline::merge_request::MergeRequest;
use shaderfade_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use shaderfade_core::shared::error::MergeError;
use shaderfade_core::shared::frame_rate::FrameRate;
use shaderfade_core::shared::merge_config::MergeConfig;
use shaderfade_core::shared::uniform_value::{UniformBindings, UniformValue};
use shaderfade_core::video::domain::command_runner::CommandRunner;
use shaderfade_core::video::infrastructure::ffmpeg_concat_assembler::FfmpegConcatAssembler;
use shaderfade_core::video::infrastructure::ffmpeg_frame_counter::FfmpegFrameCounter;
use shaderfade_core::video::infrastructure::ffmpeg_frame_encoder::FfmpegFrameEncoder;
use shaderfade_core::video::infrastructure::ffmpeg_segment_extractor::FfmpegSegmentExtractor;
use shaderfade_core::video::infrastructure::ffmpeg_tool::FfmpegTool;
use shaderfade_core::video::infrastructure::ffprobe_prober::FfprobeProber;
use shaderfade_core::video::infrastructure::system_command_runner::SystemCommandRunner;

/// Merge two videos with a GPU shader transition.
#[derive(Parser)]
#[command(name = "shaderfade")]
struct Cli {
    /// First video; its tail fades out.
    video_a: PathBuf,

    /// Second video; its head fades in.
    video_b: PathBuf,

    /// Output file (MP4).
    output: PathBuf,

    /// Transition shader, by file name with or without `.glsl`.
    #[arg(long)]
    shader: String,

    /// Transition length in seconds (0 = hard cut).
    #[arg(long, default_value = "1.0")]
    duration: f64,

    /// Extra shader uniform as name=value, value a JSON number, boolean or array.
    /// Repeatable.
    #[arg(long = "uniform", value_name = "NAME=VALUE", value_parser = parse_uniform)]
    uniforms: Vec<(String, UniformValue)>,

    /// Directory holding the transition shaders.
    #[arg(long, default_value = "./shaders")]
    shader_dir: PathBuf,

    /// JSON config file; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// H.264 CRF quality (0=lossless, 51=worst, default 18).
    #[arg(long)]
    quality: Option<u32>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error [{}]: {e}", e.kind());
        process::exit(1);
    }
}

fn run() -> Result<(), MergeError> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    validate(&cli)?;

    let catalog = Arc::new(ShaderCatalog::load(&cli.shader_dir)?);
    let job = MergeJob::new(config.clone(), catalog, build_tools(&config)?);

    let uniforms = cli
        .uniforms
        .into_iter()
        .fold(UniformBindings::new(), |bindings, (name, value)| {
            bindings.with(name, value)
        });
    let request = MergeRequest::new(cli.video_a, cli.video_b, cli.shader, cli.output)
        .with_transition_seconds(cli.duration)
        .with_uniforms(uniforms);

    let mut logger = StdoutPipelineLogger::default();
    let outcome = job.run(&request, &mut logger);
    logger.summary();

    let outcome = outcome?;
    log::info!(
        "Output written to {} ({} frames at {} fps)",
        outcome.output.display(),
        outcome.total_frames(),
        outcome.frame_rate
    );
    Ok(())
}

fn load_config(cli: &Cli) -> Result<MergeConfig, MergeError> {
    let config = match &cli.config {
        Some(path) => MergeConfig::load(path)?,
        None => MergeConfig::default(),
    };
    let config = match cli.quality {
        Some(crf) => config.with_crf(crf),
        None => config,
    };
    config.validate()?;
    Ok(config)
}

fn build_tools(config: &MergeConfig) -> Result<MergeTools, MergeError> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner::new());
    let tool = FfmpegTool::new(runner.clone(), config);
    let fallback_rate = FrameRate::from_integer(config.fallback_frame_rate).ok_or_else(|| {
        MergeError::InvalidRequest("fallback_frame_rate must be positive".to_string())
    })?;

    Ok(MergeTools {
        prober: Arc::new(FfprobeProber::new(
            runner,
            config.ffprobe_path.clone(),
            Box::new(FfmpegFrameCounter::new()),
            fallback_rate,
        )),
        extractor: Arc::new(FfmpegSegmentExtractor::new(tool.clone())),
        encoder: Arc::new(FfmpegFrameEncoder::new(tool.clone())),
        assembler: Arc::new(FfmpegConcatAssembler::new(tool)),
        compositors: Arc::new(GpuCompositorFactory),
    })
}

fn validate(cli: &Cli) -> Result<(), MergeError> {
    for input in [&cli.video_a, &cli.video_b] {
        if !input.exists() {
            return Err(MergeError::InvalidRequest(format!(
                "Input file not found: {}",
                input.display()
            )));
        }
    }
    if !cli.duration.is_finite() || cli.duration < 0.0 {
        return Err(MergeError::InvalidRequest(format!(
            "Duration must be a non-negative number of seconds, got {}",
            cli.duration
        )));
    }
    Ok(())
}

fn parse_uniform(arg: &str) -> Result<(String, UniformValue), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{arg}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing uniform name in '{arg}'"));
    }
    let value = UniformValue::parse(value)
        .map_err(|e| format!("'{value}' is not a JSON number, boolean or array of them: {e}"))?;
    Ok((name.to_string(), value))
}
