use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::ShaderStage;

use crate::shared::error::MergeError;

/// Parses and validates a translated fragment stage without touching a
/// device, so compile diagnostics are available on machines with no GPU.
pub fn validate_fragment(source: &str) -> Result<(), MergeError> {
    let module = Frontend::default()
        .parse(&Options::from(ShaderStage::Fragment), source)
        .map_err(|e| MergeError::ShaderCompile(e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| MergeError::ShaderCompile(e.emit_to_string(source)))?;

    Ok(())
}
