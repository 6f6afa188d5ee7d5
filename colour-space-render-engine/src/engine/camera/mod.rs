//! Orbit camera for inspecting the colour cloud.
//!
//! Right-drag rotates around the layout centre, the wheel zooms, and the transform is
//! smoothed towards the target each frame.

/// Viewport camera resource and controller system.
pub mod viewport_camera;
