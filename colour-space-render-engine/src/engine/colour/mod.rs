//! Colour records and the colour-space maths shared by the CPU and GPU pipelines.
//!
//! Everything here has a WGSL twin in `assets/shaders/`; the CPU versions are the
//! reference the kernels are tested against.

/// RGB <-> HSV conversion on normalised channels.
pub mod hsv;

/// Spatial layouts: RGB cube and HSV cylinder positions for a colour.
pub mod layout;

/// The 32-byte per-colour record and histogram slot addressing.
pub mod record;
