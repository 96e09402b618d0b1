//! Merges two videos into one, blending the tail of the first into the head
//! of the second with a GLSL transition shader rendered on the GPU.
//!
//! [`pipeline::merge_job::MergeJob`] drives a merge end to end. Everything
//! it talks to (probing, ffmpeg, the compositor) sits behind a trait in the
//! `domain` module of its area, with the real implementation next door in
//! `infrastructure`.

pub mod catalog;
pub mod compositing;
pub mod pipeline;
pub mod shared;
pub mod video;

#[cfg(test)]
pub(crate) mod test_support;
