//! RGB <-> HSV transition timing.
//!
//! Pure host-side state: it decides the blend weight for each frame and which array is the
//! source. The actual blending runs on the compute backend.

/// Animation state machine, direction, and active colour space.
pub mod state;
