//! Nearest-signature classification of unknown pixels.
//!
//! Every cell of the confidence matrix is collapsed to one of the two
//! certain levels: hint seeds are forced directly, and everything in
//! between is classified by comparing its color's squared Lab distance to
//! the nearest background and foreground signature centroids. Distances
//! for a given packed color never change within a run, so they are
//! memoized in a hash map keyed by the raw pixel value -- a pure lookup
//! optimization that cannot alter results, since cached and freshly
//! computed distances feed the same decision rule.
//!
//! Exact distance ties classify as background: background is the default
//! class, and a pixel must be strictly closer to the foreground signature
//! to join it.

use std::collections::HashMap;

use crate::color::CieLab;
use crate::signature::CLUSTER_SIZE;
use crate::types::{ConfidenceMatrix, Pixel};

/// Minimum distances from one color to the background and foreground
/// signatures.
#[derive(Clone, Copy)]
struct NearestDistances {
    bg: f32,
    fg: f32,
}

/// Distance to the nearest centroid of `signature`, or `fallback` if the
/// signature is empty.
fn nearest_distance(lab: &CieLab, signature: &[CieLab], fallback: f32) -> f32 {
    signature
        .iter()
        .map(|centroid| lab.distance_squared(centroid))
        .fold(fallback, f32::min)
}

/// Classify every cell of `confidence` to exactly
/// [`ConfidenceMatrix::CERTAIN_BACKGROUND`] or
/// [`ConfidenceMatrix::CERTAIN_FOREGROUND`].
///
/// `labs` must hold the Lab conversion of `pixels`, index-aligned with the
/// confidence cells. `bg_signature` must be non-empty (checked by the
/// orchestrator before this pass). An empty `fg_signature` switches the
/// decision to a fixed-radius background test against [`CLUSTER_SIZE`].
pub(crate) fn classify_pixels(
    confidence: &mut ConfidenceMatrix,
    pixels: &[Pixel],
    labs: &[CieLab],
    bg_signature: &[CieLab],
    fg_signature: &[CieLab],
) {
    debug_assert!(!bg_signature.is_empty());
    debug_assert_eq!(pixels.len(), labs.len());

    let mut cache: HashMap<u32, NearestDistances> = HashMap::new();

    for (i, value) in confidence.as_mut_slice().iter_mut().enumerate() {
        if *value >= ConfidenceMatrix::FOREGROUND {
            *value = ConfidenceMatrix::CERTAIN_FOREGROUND;
        } else if *value <= ConfidenceMatrix::BACKGROUND {
            *value = ConfidenceMatrix::CERTAIN_BACKGROUND;
        } else {
            let distances = cache.entry(pixels[i].argb()).or_insert_with(|| {
                NearestDistances {
                    bg: nearest_distance(&labs[i], bg_signature, f32::INFINITY),
                    fg: nearest_distance(&labs[i], fg_signature, 1.0e6),
                }
            });

            let is_background = if fg_signature.is_empty() {
                distances.bg <= CLUSTER_SIZE
            } else {
                distances.bg <= distances.fg
            };

            *value = if is_background {
                ConfidenceMatrix::CERTAIN_BACKGROUND
            } else {
                ConfidenceMatrix::CERTAIN_FOREGROUND
            };
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]
mod tests {
    use super::*;

    const RED: Pixel = Pixel::from_argb(0xFFFF_0000);
    const BLUE: Pixel = Pixel::from_argb(0xFF00_00FF);
    const DARK: Pixel = Pixel::from_argb(0xFF05_0505);

    fn labs_of(pixels: &[Pixel]) -> Vec<CieLab> {
        pixels.iter().map(|&p| CieLab::from_pixel(p)).collect()
    }

    fn signature_of(pixel: Pixel) -> Vec<CieLab> {
        vec![CieLab::from_pixel(pixel)]
    }

    #[test]
    fn seeds_are_forced_to_certain_levels() {
        let pixels = [RED, RED, RED, RED];
        let labs = labs_of(&pixels);
        let mut cm = ConfidenceMatrix::from_values(
            4,
            1,
            vec![
                ConfidenceMatrix::BACKGROUND,
                ConfidenceMatrix::FOREGROUND,
                ConfidenceMatrix::CERTAIN_BACKGROUND,
                ConfidenceMatrix::CERTAIN_FOREGROUND,
            ],
        );
        classify_pixels(
            &mut cm,
            &pixels,
            &labs,
            &signature_of(BLUE),
            &signature_of(RED),
        );
        assert_eq!(cm.as_slice(), &[0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn unknown_pixel_joins_nearer_signature() {
        let pixels = [RED, BLUE];
        let labs = labs_of(&pixels);
        let mut cm = ConfidenceMatrix::new(2, 1);
        classify_pixels(
            &mut cm,
            &pixels,
            &labs,
            &signature_of(BLUE),
            &signature_of(RED),
        );
        assert_eq!(cm.as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn exact_tie_classifies_as_background() {
        let pixels = [RED];
        let labs = labs_of(&pixels);
        let mut cm = ConfidenceMatrix::new(1, 1);
        // Identical signatures on both sides: min distances are equal.
        classify_pixels(
            &mut cm,
            &pixels,
            &labs,
            &signature_of(RED),
            &signature_of(RED),
        );
        assert_eq!(cm.as_slice(), &[0.0]);
    }

    #[test]
    fn empty_foreground_signature_uses_radius_fallback() {
        let pixels = [DARK, RED];
        let labs = labs_of(&pixels);
        let mut cm = ConfidenceMatrix::new(2, 1);
        // DARK is within the limit-box radius of black; RED is far outside.
        classify_pixels(
            &mut cm,
            &pixels,
            &labs,
            &signature_of(Pixel::from_argb(0xFF00_0000)),
            &[],
        );
        assert_eq!(cm.as_slice(), &[0.0, 1.0]);
    }

    #[test]
    fn every_cell_ends_exactly_certain() {
        let pixels: Vec<Pixel> = (0..16u32)
            .map(|i| Pixel::from_argb(0xFF00_0000 | (i * 0x0010_1010)))
            .collect();
        let labs = labs_of(&pixels);
        let values: Vec<f32> = (0..16).map(|i| (i as f32) / 16.0).collect();
        let mut cm = ConfidenceMatrix::from_values(4, 4, values);
        classify_pixels(
            &mut cm,
            &pixels,
            &labs,
            &signature_of(BLUE),
            &signature_of(RED),
        );
        assert!(
            cm.as_slice().iter().all(|&v| v == 0.0 || v == 1.0),
            "confidence left a non-certain value: {:?}",
            cm.as_slice(),
        );
    }

    #[test]
    fn repeated_colors_classify_identically() {
        // Same color at many positions must resolve to the same class --
        // the memo is keyed by color, not position.
        let pixels = [RED, BLUE, RED, BLUE, RED, BLUE];
        let labs = labs_of(&pixels);
        let mut cm = ConfidenceMatrix::new(6, 1);
        classify_pixels(
            &mut cm,
            &pixels,
            &labs,
            &signature_of(BLUE),
            &signature_of(RED),
        );
        assert_eq!(cm.as_slice(), &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
    }
}
