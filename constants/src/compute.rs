use crate::colour_layout::CHANNEL_LEVELS;

/// One histogram slot per representable 8-bit RGB triple.
pub const HISTOGRAM_DOMAIN_SIZE: u32 = CHANNEL_LEVELS * CHANNEL_LEVELS * CHANNEL_LEVELS;

/// Workgroup shape of the histogram kernel, one lane per pixel.
/// Must match `@workgroup_size` in `shaders/colour_histogram.wgsl`.
pub const HISTOGRAM_WORKGROUP_SIZE: [u32; 2] = [16, 16];

/// Workgroup shape of the compaction kernel, one lane per histogram slot
/// (x = blue, y = green, z = red).
/// Must match `@workgroup_size` in `shaders/unique_colours.wgsl`.
pub const COMPACTION_WORKGROUP_SIZE: [u32; 3] = [8, 8, 4];

/// Workgroup width of the per-colour kernels (work set init + animation).
/// Must match `@workgroup_size` in `shaders/colour_work_set.wgsl` and
/// `shaders/animate_colours.wgsl`.
pub const LINEAR_WORKGROUP_SIZE: u32 = 256;

/// wgpu guarantees at least this many workgroups per dispatch dimension.
pub const MAX_WORKGROUPS_PER_DIMENSION: u32 = 65_535;

/// Size in bytes of one `ColourRecord` on both sides of the bus (vec4 + vec3 + u32).
pub const COLOUR_RECORD_SIZE: u64 = 32;
