pub mod command_runner;
pub mod frame_counter;
pub mod frame_encoder;
pub mod frame_sequence;
pub mod segment;
pub mod segment_assembler;
pub mod segment_extractor;
pub mod video_prober;
