//! Main world to render world hand-off.
//!
//! The Work array never leaves the GPU: only its buffer handle, instance count, and generation
//! travel on the extracted marker component.

/// Marker component carrying the Work buffer handle and the visual scale.
pub mod colour_markers;
