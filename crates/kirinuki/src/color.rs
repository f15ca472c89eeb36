//! Perceptual CIE Lab color conversion and distance.
//!
//! Classification and clustering both work in CIE Lab space (reference
//! white D65), where Euclidean distance approximates perceived color
//! difference. Converting every pixel of a large image is conversion-bound,
//! so the two expensive roots of the transform -- the cube root of the Lab
//! compression and the fifth root used to build `x^2.4` for inverse gamma --
//! are approximated by a small lookup table polished with two Newton
//! iterations each.
//!
//! The approximation contract is a relative error within ~1e-3 of the exact
//! power over the whole input domain. Seeds come from the table entry
//! *nearest* to the input; inputs below the first table entry fall back to
//! the library root, since 16 buckets cannot resolve the curve near zero.
//! Both properties are pinned by tests below.

use std::sync::LazyLock;

use crate::types::Pixel;

/// Number of root lookup buckets across `[0, 1]`.
const ROOT_TABLE_SIZE: usize = 16;

/// Lab compression threshold: linear branch below, cube root above.
const LAB_EPSILON: f64 = 0.008856;

/// sRGB gamma threshold: linear branch below, power branch above.
const SRGB_EPSILON: f64 = 0.04045;

#[allow(clippy::cast_precision_loss)]
static CBRT_TABLE: LazyLock<[f64; ROOT_TABLE_SIZE + 1]> = LazyLock::new(|| {
    let mut table = [0.0; ROOT_TABLE_SIZE + 1];
    table[0] = (1.0 / (2.0 * ROOT_TABLE_SIZE as f64)).cbrt();
    for (i, entry) in table.iter_mut().enumerate().skip(1) {
        *entry = (i as f64 / ROOT_TABLE_SIZE as f64).cbrt();
    }
    table
});

#[allow(clippy::cast_precision_loss)]
static QNRT_TABLE: LazyLock<[f64; ROOT_TABLE_SIZE + 1]> = LazyLock::new(|| {
    let mut table = [0.0; ROOT_TABLE_SIZE + 1];
    table[0] = (1.0 / (2.0 * ROOT_TABLE_SIZE as f64)).powf(0.2);
    for (i, entry) in table.iter_mut().enumerate().skip(1) {
        *entry = (i as f64 / ROOT_TABLE_SIZE as f64).powf(0.2);
    }
    table
});

/// Nearest table index for `x` in `[0, 1]`, clamped to the last entry.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn root_table_index(x: f64) -> usize {
    let index = (x * ROOT_TABLE_SIZE as f64 + 0.5) as usize;
    index.min(ROOT_TABLE_SIZE)
}

/// Fast cube root for `x` in `[0, ~1]`.
#[allow(clippy::cast_precision_loss)]
fn fast_cbrt(x: f64) -> f64 {
    if x < 1.0 / ROOT_TABLE_SIZE as f64 {
        return x.cbrt();
    }
    let mut y = CBRT_TABLE[root_table_index(x)];
    y = (2.0 * y + x / (y * y)) / 3.0;
    y = (2.0 * y + x / (y * y)) / 3.0;
    y
}

/// Fast fifth root for `x` in `[0, 1]`.
#[allow(clippy::cast_precision_loss)]
fn fast_qnrt(x: f64) -> f64 {
    if x < 1.0 / ROOT_TABLE_SIZE as f64 {
        return x.powf(0.2);
    }
    let mut y = QNRT_TABLE[root_table_index(x)];
    let mut y2 = y * y;
    y = (4.0 * y + x / (y2 * y2)) / 5.0;
    y2 = y * y;
    y = (4.0 * y + x / (y2 * y2)) / 5.0;
    y
}

/// Fast `x^2.4` via `(x · x^0.2)² = (x^1.2)²`.
fn fast_pow24(x: f64) -> f64 {
    let one_point_two = x * fast_qnrt(x);
    one_point_two * one_point_two
}

/// sRGB channel (0–1) to linear light.
fn srgb_to_linear(channel: f64) -> f64 {
    if channel > SRGB_EPSILON {
        fast_pow24((channel + 0.055) / 1.055)
    } else {
        channel / 12.92
    }
}

/// Lab compression function `f(t)`.
fn lab_compress(t: f64) -> f64 {
    if t > LAB_EPSILON {
        fast_cbrt(t)
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

/// A color in CIE Lab space.
///
/// `weight` is the merged-sample count carried through signature
/// clustering; it takes no part in color distance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CieLab {
    /// Lightness (0 = black, 100 = diffuse white).
    pub l: f32,
    /// Green–red axis.
    pub a: f32,
    /// Blue–yellow axis.
    pub b: f32,
    /// Number of samples merged into this value; meaningful only during
    /// clustering.
    pub weight: u32,
}

impl CieLab {
    /// Convert a packed pixel to Lab. The alpha channel is ignored.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn from_pixel(pixel: Pixel) -> Self {
        let red = srgb_to_linear(f64::from(pixel.red()) / 255.0);
        let green = srgb_to_linear(f64::from(pixel.green()) / 255.0);
        let blue = srgb_to_linear(f64::from(pixel.blue()) / 255.0);

        // Linear RGB to XYZ (observer 2°, illuminant D65), scaled by the
        // D65 white point 0.95047 / 1.0 / 1.08883.
        let x = red * 0.4124 + green * 0.3576 + blue * 0.1805;
        let y = red * 0.2126 + green * 0.7152 + blue * 0.0722;
        let z = red * 0.0193 + green * 0.1192 + blue * 0.9505;

        let fx = lab_compress(x / 0.95047);
        let fy = lab_compress(y);
        let fz = lab_compress(z / 1.08883);

        Self {
            l: (116.0 * fy - 16.0) as f32,
            a: (500.0 * (fx - fy)) as f32,
            b: (200.0 * (fy - fz)) as f32,
            weight: 1,
        }
    }

    /// Convert back to a packed pixel. The inverse transform is exact
    /// (no table approximation); the result is always opaque since alpha
    /// does not survive the forward conversion.
    ///
    /// Not used by segmentation itself -- kept for inspection and debug
    /// output of Lab values.
    #[must_use]
    pub fn to_pixel(&self) -> Pixel {
        let fy = (f64::from(self.l) + 16.0) / 116.0;
        let fx = f64::from(self.a) / 500.0 + fy;
        let fz = fy - f64::from(self.b) / 200.0;

        let decompress = |f: f64| {
            let cubed = f * f * f;
            if cubed > LAB_EPSILON {
                cubed
            } else {
                (f - 16.0 / 116.0) / 7.787
            }
        };

        let x = decompress(fx) * 0.95047;
        let y = decompress(fy);
        let z = decompress(fz) * 1.08883;

        let red = x * 3.2406 + y * -1.5372 + z * -0.4986;
        let green = x * -0.9689 + y * 1.8758 + z * 0.0415;
        let blue = x * 0.0557 + y * -0.2040 + z * 1.0570;

        let gamma = |channel: f64| {
            if channel > 0.003_130_8 {
                1.055 * channel.powf(1.0 / 2.4) - 0.055
            } else {
                12.92 * channel
            }
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pack = |channel: f64| {
            let scaled = (gamma(channel) * 256.0) as i32;
            scaled.clamp(0, 255) as u8
        };

        Pixel::from_channels(0xFF, pack(red), pack(green), pack(blue))
    }

    /// Squared Euclidean distance to another Lab color, over `l`, `a` and
    /// `b` only (`weight` excluded).
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        dl.mul_add(dl, da.mul_add(da, db * db))
    }

    /// Component lookup for axis-cycled clustering: `0 → l`, `1 → a`,
    /// anything else `→ b`.
    pub(crate) const fn component(&self, axis: usize) -> f32 {
        match axis {
            0 => self.l,
            1 => self.a,
            _ => self.b,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn rgb(r: u8, g: u8, b: u8) -> Pixel {
        Pixel::from_channels(0xFF, r, g, b)
    }

    #[test]
    fn black_maps_to_origin() {
        let lab = CieLab::from_pixel(rgb(0, 0, 0));
        assert!(lab.l.abs() < 1e-4, "L of black should be 0, got {}", lab.l);
        assert!(lab.a.abs() < 1e-4, "a of black should be 0, got {}", lab.a);
        assert!(lab.b.abs() < 1e-4, "b of black should be 0, got {}", lab.b);
    }

    #[test]
    fn white_maps_to_l_100() {
        let lab = CieLab::from_pixel(rgb(255, 255, 255));
        assert!(
            (lab.l - 100.0).abs() < 0.05,
            "L of white should be 100, got {}",
            lab.l,
        );
        assert!(lab.a.abs() < 0.05, "a of white should be ~0, got {}", lab.a);
        assert!(lab.b.abs() < 0.05, "b of white should be ~0, got {}", lab.b);
    }

    #[test]
    fn pure_red_matches_reference_values() {
        // Reference values for sRGB (255, 0, 0) under D65.
        let lab = CieLab::from_pixel(rgb(255, 0, 0));
        assert!((lab.l - 53.23).abs() < 0.05, "L = {}", lab.l);
        assert!((lab.a - 80.11).abs() < 0.05, "a = {}", lab.a);
        assert!((lab.b - 67.22).abs() < 0.05, "b = {}", lab.b);
    }

    #[test]
    fn alpha_is_ignored_by_conversion() {
        let opaque = CieLab::from_pixel(Pixel::from_channels(255, 10, 200, 30));
        let transparent = CieLab::from_pixel(Pixel::from_channels(0, 10, 200, 30));
        assert_eq!(opaque.l, transparent.l);
        assert_eq!(opaque.a, transparent.a);
        assert_eq!(opaque.b, transparent.b);
    }

    #[test]
    fn round_trip_stays_within_one_per_channel() {
        for r in (0..=255u8).step_by(15) {
            for g in (0..=255u8).step_by(15) {
                for b in (0..=255u8).step_by(15) {
                    let pixel = rgb(r, g, b);
                    let back = CieLab::from_pixel(pixel).to_pixel();
                    for (got, want) in [
                        (back.red(), r),
                        (back.green(), g),
                        (back.blue(), b),
                    ] {
                        let delta = (i16::from(got) - i16::from(want)).abs();
                        assert!(
                            delta <= 1,
                            "round trip of ({r},{g},{b}) drifted by {delta}",
                        );
                    }
                    assert_eq!(back.alpha(), 0xFF);
                }
            }
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let colors = [
            rgb(255, 0, 0),
            rgb(0, 255, 0),
            rgb(0, 0, 255),
            rgb(17, 130, 207),
            rgb(250, 250, 250),
        ];
        for p in colors {
            for q in colors {
                let a = CieLab::from_pixel(p);
                let b = CieLab::from_pixel(q);
                assert_eq!(
                    a.distance_squared(&b),
                    b.distance_squared(&a),
                    "distance not symmetric for {p:?} vs {q:?}",
                );
            }
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        let lab = CieLab::from_pixel(rgb(120, 33, 99));
        assert_eq!(lab.distance_squared(&lab), 0.0);
    }

    #[test]
    fn weight_does_not_affect_distance() {
        let mut a = CieLab::from_pixel(rgb(10, 20, 30));
        let b = CieLab::from_pixel(rgb(40, 50, 60));
        let base = a.distance_squared(&b);
        a.weight = 1000;
        assert_eq!(a.distance_squared(&b), base);
    }

    #[test]
    fn fast_cbrt_stays_within_tolerance() {
        // Domain of the Lab compression branch: (LAB_EPSILON, ~1].
        let mut x = LAB_EPSILON;
        while x <= 1.0 {
            let exact = x.cbrt();
            let rel = ((fast_cbrt(x) - exact) / exact).abs();
            assert!(rel < 1e-3, "cube root off by {rel:e} at x = {x}");
            x += 5e-4;
        }
    }

    #[test]
    fn fast_pow24_stays_within_tolerance() {
        // Domain of the gamma branch: ((0.04045 + 0.055) / 1.055, 1].
        let mut x: f64 = 0.0905;
        while x <= 1.0 {
            let exact = x.powf(2.4);
            let rel = ((fast_pow24(x) - exact) / exact).abs();
            assert!(rel < 1e-3, "pow24 off by {rel:e} at x = {x}");
            x += 5e-4;
        }
    }

    #[test]
    fn component_cycles_l_a_b() {
        let lab = CieLab {
            l: 1.0,
            a: 2.0,
            b: 3.0,
            weight: 1,
        };
        assert_eq!(lab.component(0), 1.0);
        assert_eq!(lab.component(1), 2.0);
        assert_eq!(lab.component(2), 3.0);
    }
}
