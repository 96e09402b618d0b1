pub mod shader_catalog;
