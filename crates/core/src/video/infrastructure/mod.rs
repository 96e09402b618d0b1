pub mod ffmpeg_concat_assembler;
pub mod ffmpeg_frame_counter;
pub mod ffmpeg_frame_encoder;
pub mod ffmpeg_segment_extractor;
pub mod ffmpeg_tool;
pub mod ffprobe_prober;
pub mod frame_images;
pub mod system_command_runner;
