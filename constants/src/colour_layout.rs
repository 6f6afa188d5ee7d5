/// Edge length of the RGB cube the markers are laid out in. The cube is centred on the origin.
pub const RGB_CUBE_EXTENT: f32 = 10.0;

/// Radius of the HSV cylinder at full saturation.
pub const HSV_CYLINDER_RADIUS: f32 = 5.0;

/// Height of the HSV cylinder from value 0 to value 1. Centred on the origin.
pub const HSV_CYLINDER_HEIGHT: f32 = 10.0;

/// Number of representable levels per 8-bit channel.
pub const CHANNEL_LEVELS: u32 = 256;

/// Largest 8-bit channel value, used to dequantise a histogram slot.
pub const CHANNEL_MAX: f32 = 255.0;
