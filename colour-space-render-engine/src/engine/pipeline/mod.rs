//! Load-to-render orchestration.
//!
//! `ColourPipeline` is the only owner of device arrays. Each image load produces a new
//! [`generation::Generation`]; the previous one is dropped before any work for the next is
//! submitted.

/// One image's worth of pipeline output.
pub mod generation;

/// Stage sequencing, animation driving, and the public viewer API.
pub mod orchestrator;
