pub mod glsl_translator;
pub mod gpu_context;
pub mod gpu_shader_compositor;
pub mod shader_validation;
pub mod uniform_layout;
