//! Stubs shared by unit tests across modules.

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::video::domain::command_runner::{CommandOutput, CommandRunner};

pub type RecordedCalls = Arc<Mutex<Vec<(String, Vec<String>)>>>;

type Handler = Box<dyn Fn(&str, &[String]) -> io::Result<CommandOutput> + Send + Sync>;

/// Records every invocation and answers with a caller-provided handler.
pub struct RecordingRunner {
    calls: RecordedCalls,
    handler: Handler,
}

impl RecordingRunner {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &[String]) -> io::Result<CommandOutput> + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            handler: Box::new(handler),
        }
    }

    /// Succeeds for every call and touches the output file (last argument).
    pub fn touching_outputs() -> Self {
        Self::new(|_, args| {
            touch_last_arg(args);
            Ok(CommandOutput::ok(Vec::new()))
        })
    }

    pub fn calls(&self) -> RecordedCalls {
        self.calls.clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        (self.handler)(program, args)
    }
}

pub fn touch_last_arg(args: &[String]) {
    if let Some(out) = args.last() {
        std::fs::write(out, b"stub").unwrap();
    }
}

/// Value following `flag` in an argument list.
pub fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Writes `count` solid PNG frames following a `frame_%05d.png` pattern.
pub fn write_png_frames(pattern: &Path, count: usize, width: u32, height: u32, value: u8) {
    let dir = pattern.parent().unwrap();
    for i in 0..count {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([value, value, value]));
        img.save(dir.join(crate::shared::constants::frame_file_name(i)))
            .unwrap();
    }
}
