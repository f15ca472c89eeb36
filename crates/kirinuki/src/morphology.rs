//! Morphological filters over the confidence matrix.
//!
//! All operators are separable into four directional sweeps -- left-to-right,
//! right-to-left, top-to-bottom, bottom-to-top -- that overwrite the matrix
//! in place, so later sweeps see the results of earlier ones. This makes the
//! filters intentionally one-sided (a symmetric filter would need a second
//! buffer); the pipeline depends on this exact behavior, so the sweeps must
//! not be reordered or double-buffered.
//!
//! The orchestrator applies these in a fixed order only; there is no other
//! configuration surface.

use crate::types::ConfidenceMatrix;

/// Dimensions of `confidence` as `(width, height)` in `usize`.
fn extent(confidence: &ConfidenceMatrix) -> (usize, usize) {
    (
        confidence.width() as usize,
        confidence.height() as usize,
    )
}

/// 3-tap weighted running average, swept in all four directions.
///
/// `w1` weighs the current cell, `w2` and `w3` the next two cells in sweep
/// direction. Weights summing to 1 keep the value range stable; the
/// pipeline uses (⅓, ⅓, ⅓).
pub fn smooth(confidence: &mut ConfidenceMatrix, w1: f32, w2: f32, w3: f32) {
    let (width, height) = extent(confidence);
    let values = confidence.as_mut_slice();

    for y in 0..height {
        let row = y * width;
        for x in 0..width.saturating_sub(2) {
            let i = row + x;
            values[i] = w1 * values[i] + w2 * values[i + 1] + w3 * values[i + 2];
        }
    }
    for y in 0..height {
        let row = y * width;
        for x in (2..width).rev() {
            let i = row + x;
            values[i] = w3 * values[i - 2] + w2 * values[i - 1] + w1 * values[i];
        }
    }
    for y in 0..height.saturating_sub(2) {
        for x in 0..width {
            let i = y * width + x;
            values[i] = w1 * values[i] + w2 * values[i + width] + w3 * values[i + 2 * width];
        }
    }
    for y in (2..height).rev() {
        for x in 0..width {
            let i = y * width + x;
            values[i] = w3 * values[i - 2 * width] + w2 * values[i - width] + w1 * values[i];
        }
    }
}

/// Morphological erosion: every cell takes the minimum of itself and its
/// forward neighbor, per directional sweep. Shrinks confident regions and
/// removes isolated spikes.
pub fn erode(confidence: &mut ConfidenceMatrix) {
    let (width, height) = extent(confidence);
    let values = confidence.as_mut_slice();

    for y in 0..height {
        let row = y * width;
        for x in 0..width.saturating_sub(1) {
            let i = row + x;
            if values[i + 1] < values[i] {
                values[i] = values[i + 1];
            }
        }
    }
    for y in 0..height {
        let row = y * width;
        for x in (1..width).rev() {
            let i = row + x;
            if values[i - 1] < values[i] {
                values[i] = values[i - 1];
            }
        }
    }
    for y in 0..height.saturating_sub(1) {
        for x in 0..width {
            let i = y * width + x;
            if values[i + width] < values[i] {
                values[i] = values[i + width];
            }
        }
    }
    for y in (1..height).rev() {
        for x in 0..width {
            let i = y * width + x;
            if values[i - width] < values[i] {
                values[i] = values[i - width];
            }
        }
    }
}

/// Morphological dilation: every cell takes the maximum of itself and its
/// forward neighbor, per directional sweep. Grows confident regions and
/// closes small holes.
pub fn dilate(confidence: &mut ConfidenceMatrix) {
    let (width, height) = extent(confidence);
    let values = confidence.as_mut_slice();

    for y in 0..height {
        let row = y * width;
        for x in 0..width.saturating_sub(1) {
            let i = row + x;
            if values[i + 1] > values[i] {
                values[i] = values[i + 1];
            }
        }
    }
    for y in 0..height {
        let row = y * width;
        for x in (1..width).rev() {
            let i = row + x;
            if values[i - 1] > values[i] {
                values[i] = values[i - 1];
            }
        }
    }
    for y in 0..height.saturating_sub(1) {
        for x in 0..width {
            let i = y * width + x;
            if values[i + width] > values[i] {
                values[i] = values[i + width];
            }
        }
    }
    for y in (1..height).rev() {
        for x in 0..width {
            let i = y * width + x;
            if values[i - width] > values[i] {
                values[i] = values[i - width];
            }
        }
    }
}

/// Rescale the matrix so its maximum becomes 1.
///
/// No-op if the maximum is not positive (nothing to scale) or already
/// exactly 1 -- the latter makes a second call idempotent and keeps
/// exact-level cells untouched.
#[allow(clippy::float_cmp)]
pub fn normalize(confidence: &mut ConfidenceMatrix) {
    let values = confidence.as_mut_slice();
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if max <= 0.0 || max == 1.0 {
        return;
    }

    let factor = 1.0 / max;
    for value in values {
        *value *= factor;
    }
}
