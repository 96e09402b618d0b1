pub mod infrastructure;
pub mod job_workspace;
pub mod merge_job;
pub mod merge_request;
pub mod pipeline_logger;
pub mod transition_window;
