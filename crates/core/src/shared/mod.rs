pub mod constants;
pub mod error;
pub mod frame;
pub mod frame_rate;
pub mod merge_config;
pub mod uniform_value;
pub mod video_stream;
