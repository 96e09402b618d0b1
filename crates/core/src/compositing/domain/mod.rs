pub mod shader_program;
pub mod transition_compositor;
