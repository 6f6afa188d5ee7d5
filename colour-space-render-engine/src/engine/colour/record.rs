use bytemuck::{Pod, Zeroable};
use constants::colour_layout::{CHANNEL_LEVELS, CHANNEL_MAX};
use constants::compute::{COLOUR_RECORD_SIZE, HISTOGRAM_DOMAIN_SIZE};

use crate::engine::colour::layout::ColourLayout;

/// One distinct colour: its normalised RGBA value, where it sits in the current layout,
/// and how many pixels carried it.
///
/// Matches the WGSL struct used by every kernel and by the marker vertex shader:
/// ```wgsl
/// struct ColourRecord {
///     colour: vec4<f32>,   // offset 0
///     position: vec3<f32>, // offset 16
///     count: u32,          // offset 28
/// }
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ColourRecord {
    pub colour: [f32; 4],
    pub position: [f32; 3],
    pub count: u32,
}

const _: () = assert!(std::mem::size_of::<ColourRecord>() as u64 == COLOUR_RECORD_SIZE);

impl ColourRecord {
    /// Record for a non-empty histogram slot, positioned in the RGB cube.
    pub fn from_slot(slot: u32, count: u32, layout: &ColourLayout) -> Self {
        let rgb = dequantise(slot_rgb(slot));
        Self {
            colour: [rgb[0], rgb[1], rgb[2], 1.0],
            position: layout.rgb_position(rgb),
            count,
        }
    }

    pub fn rgb(&self) -> [f32; 3] {
        [self.colour[0], self.colour[1], self.colour[2]]
    }

    /// Same colour and count, different position.
    pub fn with_position(self, position: [f32; 3]) -> Self {
        Self { position, ..self }
    }
}

/// Histogram slot of an 8-bit RGB triple: `(r << 16) | (g << 8) | b`.
#[inline]
pub fn slot_index([r, g, b]: [u8; 3]) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Inverse of [`slot_index`].
#[inline]
pub fn slot_rgb(slot: u32) -> [u8; 3] {
    debug_assert!(slot < HISTOGRAM_DOMAIN_SIZE, "slot {slot} outside the histogram domain");
    let level = CHANNEL_LEVELS - 1;
    [
        ((slot >> 16) & level) as u8,
        ((slot >> 8) & level) as u8,
        (slot & level) as u8,
    ]
}

#[inline]
pub fn dequantise(rgb: [u8; 3]) -> [f32; 3] {
    rgb.map(|c| f32::from(c) / CHANNEL_MAX)
}

/// Nearest 8-bit level per channel. Inverts [`dequantise`] and absorbs float error from
/// colour-space round trips.
#[inline]
pub fn quantise(rgb: [f32; 3]) -> [u8; 3] {
    rgb.map(|c| (c.clamp(0.0, 1.0) * CHANNEL_MAX + 0.5) as u8)
}
