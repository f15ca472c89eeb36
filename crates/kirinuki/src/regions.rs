//! Connected-component analysis over the confidence matrix.
//!
//! Both passes label maximal 4-connected regions with an explicit worklist
//! (a stack of pending pixel indices) instead of call-stack recursion -- a
//! flood fill across a large image would otherwise overflow the stack. The
//! label field is transient and rebuilt per pass.
//!
//! [`keep_only_large_components`] prunes confidence islands that are small
//! relative to the largest one; [`grow_matching_color_regions`] expands
//! surviving foreground through neighbors of near-identical color,
//! correcting classification noise along flat-color boundaries.

use crate::color::CieLab;
use crate::types::ConfidenceMatrix;

/// Unlabeled marker in the label field.
const UNLABELED: i32 = -1;

/// 4-connected neighbors of `pos` as `(in_bounds, index)` candidates.
fn neighbors(pos: usize, width: usize, height: usize) -> [(bool, usize); 4] {
    let x = pos % width;
    let y = pos / width;
    [
        (x > 0, pos.wrapping_sub(1)),
        (x + 1 < width, pos + 1),
        (y > 0, pos.wrapping_sub(width)),
        (y + 1 < height, pos + width),
    ]
}

/// Label every maximal region with confidence ≥ `threshold`, then reset
/// regions whose pixel count scaled by `size_factor` falls short of the
/// largest region's count to [`ConfidenceMatrix::CERTAIN_BACKGROUND`]. The
/// largest region itself is always forced to
/// [`ConfidenceMatrix::CERTAIN_FOREGROUND`].
///
/// With no pixel at or above `threshold` the pass is a no-op; an
/// all-background matrix is a valid outcome, not an error.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
pub fn keep_only_large_components(
    confidence: &mut ConfidenceMatrix,
    threshold: f32,
    size_factor: f32,
) {
    let width = confidence.width() as usize;
    let height = confidence.height() as usize;
    let values = confidence.as_mut_slice();
    let cell_count = values.len();

    let mut labels = vec![UNLABELED; cell_count];
    let mut region_sizes: Vec<usize> = Vec::new();
    let mut largest_size = 0usize;
    let mut largest_label = 0i32;
    let mut worklist: Vec<usize> = Vec::new();

    for start in 0..cell_count {
        if labels[start] != UNLABELED || values[start] < threshold {
            continue;
        }

        let label = region_sizes.len() as i32;
        labels[start] = label;
        let mut region_size = 1usize;
        worklist.push(start);

        while let Some(pos) = worklist.pop() {
            for (in_bounds, neighbor) in neighbors(pos, width, height) {
                if in_bounds && labels[neighbor] == UNLABELED && values[neighbor] >= threshold {
                    labels[neighbor] = label;
                    region_size += 1;
                    worklist.push(neighbor);
                }
            }
        }

        if region_size > largest_size {
            largest_size = region_size;
            largest_label = label;
        }
        region_sizes.push(region_size);
    }

    for (value, &label) in values.iter_mut().zip(&labels) {
        if label == UNLABELED {
            continue;
        }
        if (region_sizes[label as usize] as f64) * f64::from(size_factor) < largest_size as f64 {
            *value = ConfidenceMatrix::CERTAIN_BACKGROUND;
        }
        if label == largest_label {
            *value = ConfidenceMatrix::CERTAIN_FOREGROUND;
        }
    }
}

/// From every unlabeled pixel with confidence ≥
/// [`ConfidenceMatrix::UNKNOWN`], flood through 4-connected neighbors whose
/// color lies within Lab distance 1.0 of the seed's original color --
/// regardless of the neighbors' current confidence -- and force the whole
/// region to [`ConfidenceMatrix::CERTAIN_FOREGROUND`].
///
/// `labs` must hold the Lab conversion of the image, index-aligned with the
/// confidence cells. Distances compare squared against 1.0², so no square
/// root is taken.
///
/// # Panics
///
/// Panics if `labs` does not match the matrix cell count.
#[allow(clippy::cast_possible_wrap)]
pub fn grow_matching_color_regions(confidence: &mut ConfidenceMatrix, labs: &[CieLab]) {
    let width = confidence.width() as usize;
    let height = confidence.height() as usize;
    let values = confidence.as_mut_slice();
    let cell_count = values.len();
    assert!(
        labs.len() == cell_count,
        "lab slice length {} does not match {cell_count} cells",
        labs.len(),
    );

    let mut labels = vec![UNLABELED; cell_count];
    let mut worklist: Vec<usize> = Vec::new();

    for start in 0..cell_count {
        if labels[start] != UNLABELED || values[start] < ConfidenceMatrix::UNKNOWN {
            continue;
        }

        let seed = labs[start];
        let label = start as i32 + 1;
        labels[start] = label;
        values[start] = ConfidenceMatrix::CERTAIN_FOREGROUND;
        worklist.push(start);

        while let Some(pos) = worklist.pop() {
            for (in_bounds, neighbor) in neighbors(pos, width, height) {
                if in_bounds
                    && labels[neighbor] == UNLABELED
                    && labs[neighbor].distance_squared(&seed) < 1.0
                {
                    labels[neighbor] = label;
                    values[neighbor] = ConfidenceMatrix::CERTAIN_FOREGROUND;
                    worklist.push(neighbor);
                }
            }
        }
    }
}
