use std::fmt;

use thiserror::Error;

/// Failure of a merge job, one variant per pipeline stage that can fail.
///
/// Every variant carries a human-readable cause; tool stderr and shader
/// compiler diagnostics are included verbatim.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("failed to probe {path}: {message}")]
    Probe { path: String, message: String },
    #[error(
        "transition of {requested} frames exceeds available frames \
         (video A has {available_a}, video B has {available_b})"
    )]
    TransitionTooLong {
        requested: usize,
        available_a: usize,
        available_b: usize,
    },
    #[error("shader failed to compile:\n{0}")]
    ShaderCompile(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("encoding failed: {0}")]
    Encode(String),
    #[error("assembly failed: {0}")]
    Assembly(String),
    #[error("workspace error: {0}")]
    Workspace(String),
}

/// Stable, matchable error category for the request layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    Probe,
    TransitionTooLong,
    ShaderCompile,
    Render,
    Extraction,
    Encode,
    Assembly,
    Workspace,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Probe => "probe_error",
            ErrorKind::TransitionTooLong => "transition_too_long",
            ErrorKind::ShaderCompile => "shader_compile_error",
            ErrorKind::Render => "render_error",
            ErrorKind::Extraction => "extraction_error",
            ErrorKind::Encode => "encode_error",
            ErrorKind::Assembly => "assembly_error",
            ErrorKind::Workspace => "workspace_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MergeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MergeError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            MergeError::Probe { .. } => ErrorKind::Probe,
            MergeError::TransitionTooLong { .. } => ErrorKind::TransitionTooLong,
            MergeError::ShaderCompile(_) => ErrorKind::ShaderCompile,
            MergeError::Render(_) => ErrorKind::Render,
            MergeError::Extraction(_) => ErrorKind::Extraction,
            MergeError::Encode(_) => ErrorKind::Encode,
            MergeError::Assembly(_) => ErrorKind::Assembly,
            MergeError::Workspace(_) => ErrorKind::Workspace,
        }
    }

    pub fn probe(path: &std::path::Path, message: impl Into<String>) -> Self {
        MergeError::Probe {
            path: path.display().to_string(),
            message: message.into(),
        }
    }
}

/// Trims tool stderr to something that fits in an error message.
pub fn stderr_excerpt(stderr: &[u8]) -> String {
    const MAX_LINES: usize = 20;
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(MAX_LINES);
    lines[start..].join("\n")
}
