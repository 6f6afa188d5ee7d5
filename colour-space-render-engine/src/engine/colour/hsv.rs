//! Hexcone RGB <-> HSV on channels normalised to `0.0..=1.0`.
//!
//! Hue is expressed in turns (`0.0..1.0`) rather than degrees so it maps straight onto an angle.
//! `shaders/colour_work_set.wgsl` carries the same conversion for the GPU path.

/// Converts normalised RGB to `[hue, saturation, value]`.
///
/// Achromatic colours (`max == min`) get hue 0, black gets saturation 0.
pub fn rgb_to_hsv([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };

    let saturation = if max <= 0.0 { 0.0 } else { delta / max };

    [hue.rem_euclid(1.0), saturation, max]
}

/// Converts `[hue, saturation, value]` back to normalised RGB.
pub fn hsv_to_rgb([hue, saturation, value]: [f32; 3]) -> [f32; 3] {
    let h = hue.rem_euclid(1.0) * 6.0;
    let chroma = value * saturation;
    let x = chroma * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = value - chroma;

    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    [r + m, g + m, b + m]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::colour::record::{dequantise, quantise};

    fn assert_close(a: [f32; 3], b: [f32; 3]) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn primaries_have_expected_hues() {
        assert_close(rgb_to_hsv([1.0, 0.0, 0.0]), [0.0, 1.0, 1.0]);
        assert_close(rgb_to_hsv([0.0, 1.0, 0.0]), [1.0 / 3.0, 1.0, 1.0]);
        assert_close(rgb_to_hsv([0.0, 0.0, 1.0]), [2.0 / 3.0, 1.0, 1.0]);
        assert_close(rgb_to_hsv([1.0, 0.0, 1.0]), [5.0 / 6.0, 1.0, 1.0]);
    }

    #[test]
    fn greys_are_unsaturated() {
        assert_close(rgb_to_hsv([0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
        assert_close(rgb_to_hsv([0.5, 0.5, 0.5]), [0.0, 0.0, 0.5]);
        // Hue is irrelevant once saturation is zero.
        assert_close(hsv_to_rgb([0.7, 0.0, 0.25]), [0.25, 0.25, 0.25]);
    }

    #[test]
    fn every_quantised_level_round_trips() {
        // Coarse sweep of the cube plus every level on the three edges through black.
        let mut samples = Vec::new();
        for r in (0..=255u8).step_by(15) {
            for g in (0..=255u8).step_by(17) {
                for b in (0..=255u8).step_by(51) {
                    samples.push([r, g, b]);
                }
            }
        }
        for c in 0..=255u8 {
            samples.extend([[c, 0, 0], [0, c, 0], [0, 0, c], [c, c, c]]);
        }

        for rgb in samples {
            let back = hsv_to_rgb(rgb_to_hsv(dequantise(rgb)));
            assert_eq!(quantise(back), rgb, "round trip drifted for {rgb:?}");
        }
    }
}
