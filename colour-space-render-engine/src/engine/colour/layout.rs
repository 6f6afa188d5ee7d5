use constants::colour_layout::{HSV_CYLINDER_HEIGHT, HSV_CYLINDER_RADIUS, RGB_CUBE_EXTENT};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::engine::colour::hsv::{hsv_to_rgb, rgb_to_hsv};

/// World-space extents of the two layouts. Both are centred on the origin, Y up.
///
/// - RGB cube: `x = r`, `y = g`, `z = b`, each mapped from `0..=1` to `-extent/2..=extent/2`.
/// - HSV cylinder: hue is the angle around Y, saturation the distance from the axis,
///   value the height.
///
/// The HSV mapping is a bijection onto the set of RGB colours: every grey collapses onto the
/// axis, where hue carries no information, so distinct colours never share a position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColourLayout {
    pub rgb_extent: f32,
    pub hsv_radius: f32,
    pub hsv_height: f32,
}

impl Default for ColourLayout {
    fn default() -> Self {
        Self {
            rgb_extent: RGB_CUBE_EXTENT,
            hsv_radius: HSV_CYLINDER_RADIUS,
            hsv_height: HSV_CYLINDER_HEIGHT,
        }
    }
}

impl ColourLayout {
    pub fn rgb_position(&self, rgb: [f32; 3]) -> [f32; 3] {
        rgb.map(|c| (c - 0.5) * self.rgb_extent)
    }

    pub fn hsv_position(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [hue, saturation, value] = rgb_to_hsv(rgb);
        let angle = hue * TAU;
        let radius = saturation * self.hsv_radius;
        [
            radius * angle.cos(),
            (value - 0.5) * self.hsv_height,
            radius * angle.sin(),
        ]
    }

    /// Inverse of [`Self::hsv_position`]. Nothing at runtime needs it; it is public so the
    /// integration tests can check the HSV array against the colours it was built from.
    pub fn rgb_from_cylinder_position(&self, [x, y, z]: [f32; 3]) -> [f32; 3] {
        let saturation = (x * x + z * z).sqrt() / self.hsv_radius;
        let hue = z.atan2(x) / TAU;
        let value = y / self.hsv_height + 0.5;
        hsv_to_rgb([hue.rem_euclid(1.0), saturation, value])
    }

    /// Packed for the compute kernels' uniform blocks.
    pub(crate) fn as_uniform(&self) -> [f32; 3] {
        [self.rgb_extent, self.hsv_radius, self.hsv_height]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::colour::record::{dequantise, quantise};
    use std::collections::HashSet;

    fn rgb_from_cube_position(layout: &ColourLayout, position: [f32; 3]) -> [f32; 3] {
        position.map(|p| p / layout.rgb_extent + 0.5)
    }

    #[test]
    fn cube_is_centred() {
        let layout = ColourLayout::default();
        assert_eq!(layout.rgb_position([0.0, 0.0, 0.0]), [-5.0, -5.0, -5.0]);
        assert_eq!(layout.rgb_position([1.0, 1.0, 1.0]), [5.0, 5.0, 5.0]);
        assert_eq!(layout.rgb_position([0.5, 0.5, 0.5]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn greys_sit_on_the_cylinder_axis() {
        let layout = ColourLayout::default();
        let [x, y, z] = layout.hsv_position([0.25, 0.25, 0.25]);
        assert_eq!((x, z), (0.0, 0.0));
        assert!((y - (0.25 - 0.5) * layout.hsv_height).abs() < 1e-6);
    }

    #[test]
    fn both_layouts_invert_back_to_the_colour() {
        let layout = ColourLayout {
            rgb_extent: 4.0,
            hsv_radius: 3.0,
            hsv_height: 7.0,
        };
        for r in (0..=255u8).step_by(17) {
            for g in (0..=255u8).step_by(51) {
                for b in (0..=255u8).step_by(85) {
                    let rgb = dequantise([r, g, b]);
                    let from_cube = rgb_from_cube_position(&layout, layout.rgb_position(rgb));
                    let from_cylinder = layout.rgb_from_cylinder_position(layout.hsv_position(rgb));
                    assert_eq!(quantise(from_cube), [r, g, b]);
                    assert_eq!(quantise(from_cylinder), [r, g, b]);
                }
            }
        }
    }

    #[test]
    fn distinct_colours_get_distinct_cylinder_positions() {
        let layout = ColourLayout::default();
        let mut seen = HashSet::new();
        for r in (0..=255u8).step_by(51) {
            for g in (0..=255u8).step_by(51) {
                for b in (0..=255u8).step_by(51) {
                    let position = layout.hsv_position(dequantise([r, g, b]));
                    // Compare on a grid well below marker size.
                    let key = position.map(|p| (p * 1e4).round() as i64);
                    assert!(seen.insert(key), "collision at {:?}", [r, g, b]);
                }
            }
        }
    }
}
