//! Color signature clustering.
//!
//! A *signature* is a small set of representative Lab centroids summarizing
//! the sample colors of one class (known background or known foreground).
//! It is built by a two-stage recursive axis-aligned partition of the
//! samples:
//!
//! - **Stage one** recursively splits the sample range in half whenever its
//!   extent on the current axis (cycling `l`, `a`, `b` by recursion depth)
//!   exceeds that axis' cluster limit, and otherwise collapses the range
//!   into a single centroid carrying the sample count as its weight.
//! - **Stage two** runs the same procedure over the stage-one centroids,
//!   re-merging clusters that stage one split across cell borders. A leaf
//!   is kept only if its merged weight reaches 0.1% of the original sample
//!   count, which discards color noise.
//!
//! Splitting partitions the slice in place with a two-pointer exchange and
//! recurses on the two sub-slices; no auxiliary buffers are allocated
//! beyond the output centroids.
//!
//! The per-axis limits and the retention fraction are empirically tuned
//! values; segmentation quality is sensitive to them.

use crate::color::CieLab;

/// Maximum cluster extent per Lab axis (`l`, `a`, `b`).
pub const CLUSTER_LIMITS: [f32; 3] = [0.64, 1.28, 2.56];

/// Squared distance between opposite corners of the per-axis limit box:
/// `Σ (2·limit_i)²`. Used as the background-match radius when no
/// foreground signature exists.
pub const CLUSTER_SIZE: f32 = 4.0
    * (CLUSTER_LIMITS[0] * CLUSTER_LIMITS[0]
        + CLUSTER_LIMITS[1] * CLUSTER_LIMITS[1]
        + CLUSTER_LIMITS[2] * CLUSTER_LIMITS[2]);

/// Fraction of the original sample count a stage-two leaf must reach to be
/// retained in the signature.
const RETENTION_FRACTION: f32 = 0.001;

/// Build a color signature for one class from its Lab samples.
///
/// Returns the retained centroids in traversal order (the order carries no
/// meaning). An empty sample set yields an empty signature; whether that is
/// an error is the caller's concern -- it is fatal for the background class
/// and a legitimate state for the foreground class.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn create_signature(samples: &[CieLab]) -> Vec<CieLab> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut points = samples.to_vec();
    let mut centroids = Vec::new();
    stage_one(&mut points, 0, &mut centroids);

    let threshold = samples.len() as f32 * RETENTION_FRACTION;
    let mut signature = Vec::new();
    stage_two(&mut centroids, 0, threshold, &mut signature);
    signature
}

/// Minimum and maximum of `points` on the given axis.
fn axis_range(points: &[CieLab], axis: usize) -> (f32, f32) {
    let mut min = points[0].component(axis);
    let mut max = min;
    for point in &points[1..] {
        let value = point.component(axis);
        min = min.min(value);
        max = max.max(value);
    }
    (min, max)
}

/// Two-pointer in-place partition around `pivot` on `axis`.
///
/// Returns the index of the first element of the upper half. Requires at
/// least one element `<= pivot` and one `> pivot` (guaranteed by the
/// callers, which pick the pivot strictly between the axis minimum and
/// maximum); both scans then stop within bounds and both halves are
/// non-empty.
fn partition(points: &mut [CieLab], axis: usize, pivot: f32) -> usize {
    let mut left = 0;
    let mut right = points.len() - 1;
    loop {
        while points[left].component(axis) <= pivot {
            left += 1;
        }
        while points[right].component(axis) > pivot {
            right -= 1;
        }
        if left > right {
            break;
        }
        points.swap(left, right);
        left += 1;
        right -= 1;
    }
    left
}

/// Element-wise mean of `points`; the result's weight is the point count.
#[allow(clippy::cast_precision_loss)]
fn mean_centroid(points: &[CieLab]) -> CieLab {
    let count = points.len() as f32;
    let mut l = 0.0;
    let mut a = 0.0;
    let mut b = 0.0;
    for point in points {
        l += point.l;
        a += point.a;
        b += point.b;
    }
    CieLab {
        l: l / count,
        a: a / count,
        b: b / count,
        weight: points.len() as u32,
    }
}

/// Mean of `points` weighted by each point's own weight; the result's
/// weight is the weight sum.
#[allow(clippy::cast_precision_loss)]
fn weighted_centroid(points: &[CieLab]) -> CieLab {
    let mut total = 0u32;
    let mut l = 0.0;
    let mut a = 0.0;
    let mut b = 0.0;
    for point in points {
        let weight = point.weight as f32;
        l += point.l * weight;
        a += point.a * weight;
        b += point.b * weight;
        total += point.weight;
    }
    let total_f = total as f32;
    CieLab {
        l: l / total_f,
        a: a / total_f,
        b: b / total_f,
        weight: total,
    }
}

/// Stage one: split while the current axis extent exceeds its limit,
/// otherwise collapse the range into one count-weighted centroid.
fn stage_one(points: &mut [CieLab], depth: usize, centroids: &mut Vec<CieLab>) {
    if points.is_empty() {
        return;
    }

    let axis = depth % 3;
    let (min, max) = axis_range(points, axis);

    if max - min > CLUSTER_LIMITS[axis] {
        let pivot = (min + max) / 2.0;
        let split = partition(points, axis, pivot);
        let (lower, upper) = points.split_at_mut(split);
        stage_one(lower, depth + 1, centroids);
        stage_one(upper, depth + 1, centroids);
    } else {
        centroids.push(mean_centroid(points));
    }
}

/// Stage two: same recursion over stage-one centroids; a leaf is emitted
/// only if its merged weight reaches the retention threshold.
#[allow(clippy::cast_precision_loss)]
fn stage_two(points: &mut [CieLab], depth: usize, threshold: f32, signature: &mut Vec<CieLab>) {
    if points.is_empty() {
        return;
    }

    let axis = depth % 3;
    let (min, max) = axis_range(points, axis);

    if max - min > CLUSTER_LIMITS[axis] {
        let pivot = (min + max) / 2.0;
        let split = partition(points, axis, pivot);
        let (lower, upper) = points.split_at_mut(split);
        stage_two(lower, depth + 1, threshold, signature);
        stage_two(upper, depth + 1, threshold, signature);
    } else {
        let total: u32 = points.iter().map(|p| p.weight).sum();
        if total as f32 >= threshold {
            signature.push(weighted_centroid(points));
        }
    }
}
