//! Colour deduplication kernels and the backends that run them.
//!
//! ## Stages
//!
//! ### Histogram (`colour_histogram.wgsl`)
//! One lane per pixel increments the atomic counter of its 24-bit RGB slot.
//!
//! ### Unique colour compaction (`unique_colours.wgsl`)
//! One lane per histogram slot. Non-zero slots reserve an output index through a single atomic
//! counter and write a `ColourRecord` placed in the RGB cube. Output order is unspecified.
//!
//! ### Count readback
//! The only blocking host sync in a load: the counter is copied to a staging buffer and mapped.
//!
//! ### Work set init (`colour_work_set.wgsl`)
//! Builds the HSV-space array from the RGB-space array and seeds the work array.
//!
//! ### Animator (`animate_colours.wgsl`)
//! Per frame, `work[i] = blend(source[i], destination[i], weight)`.
//!
//! ## WGSL Shader Bindings
//!
//! ```wgsl
//! // colour_histogram.wgsl
//! @group(0) @binding(0) var<uniform> params: HistogramParams;
//! @group(0) @binding(1) var<storage, read> pixels: array<u32>;
//! @group(0) @binding(2) var<storage, read_write> histogram: array<atomic<u32>>;
//!
//! // unique_colours.wgsl
//! @group(0) @binding(0) var<uniform> params: CompactionParams;
//! @group(0) @binding(1) var<storage, read> histogram: array<u32>;
//! @group(0) @binding(2) var<storage, read_write> unique_colours: array<ColourRecord>;
//! @group(0) @binding(3) var<storage, read_write> counter: atomic<u32>;
//! ```

/// Backend trait, readback errors, and the host-side blend shared with the CPU path.
pub mod backend;

/// Rayon implementation used by tests and the `--cpu` launch flag.
pub mod cpu_backend;

/// Workgroup arithmetic for every kernel dispatch.
pub mod dispatch;

/// wgpu implementation driving the WGSL kernels through Bevy's render device.
pub mod gpu_backend;
