use bevy::math::Vec3;

/// Default seconds for one RGB <-> HSV transition.
pub const DEFAULT_ANIMATION_TIME: f32 = 2.0;

/// Default visual scale multiplier applied to every marker.
pub const DEFAULT_MARKER_SCALE: f32 = 1.0;

/// Scale bounds for the +/- keys.
pub const MIN_MARKER_SCALE: f32 = 0.05;
pub const MAX_MARKER_SCALE: f32 = 20.0;

/// Factor applied per +/- key press.
pub const MARKER_SCALE_STEP: f32 = 1.25;

/// Radius of a marker with count 1 at scale 1. Radius grows with the cube root of the count
/// so that marker volume tracks occurrence count.
pub const MARKER_BASE_RADIUS: f32 = 0.02;

/// Sphere tessellation for the shared marker mesh.
pub const MARKER_SPHERE_SECTORS: u32 = 12;
pub const MARKER_SPHERE_STACKS: u32 = 8;

/// Initial orbit camera placement.
pub const CAMERA_FOCUS: Vec3 = Vec3::ZERO;
pub const CAMERA_START_DISTANCE: f32 = 22.0;
pub const CAMERA_START_YAW: f32 = 0.6;
pub const CAMERA_START_PITCH: f32 = -0.45;

/// Camera distance bounds for the scroll wheel.
pub const CAMERA_MIN_DISTANCE: f32 = 2.0;
pub const CAMERA_MAX_DISTANCE: f32 = 120.0;

/// Background clear colour (linear RGB).
pub const CLEAR_COLOUR: [f32; 3] = [0.06, 0.06, 0.07];
