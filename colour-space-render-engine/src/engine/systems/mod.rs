//! Per-frame viewer systems.
//!
//! Input becomes request events, request handlers drive the `ColourPipeline`, and the status
//! overlay reports the result.

/// Keyboard shortcuts and file drops mapped onto viewer requests.
pub mod input;

/// Status overlay: unique colour count, active layout, scale, and FPS.
pub mod status;

/// Request events, the per-backend viewer plugin, and the animation driver.
pub mod viewer;
