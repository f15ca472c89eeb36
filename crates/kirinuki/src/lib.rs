//! kirinuki: foreground/background segmentation engine (sans-IO).
//!
//! Given a raster image and a sparse set of user hints -- pixels marked
//! certainly-background, certainly-foreground, or unknown -- the engine
//! computes a refined full-image foreground mask and returns a copy of the
//! image with the background replaced by a fill color. It is the analysis
//! core of an interactive cutout tool: the surrounding application owns
//! windowing, rendering, hint painting and file I/O, and talks to this
//! crate through in-memory buffers only.
//!
//! The pipeline: convert the image to CIE Lab, cluster hinted samples into
//! background/foreground color signatures, classify every unknown pixel by
//! its nearest signature, then clean the resulting confidence matrix with
//! smoothing, erosion, connected-component pruning, same-color region
//! growth and dilation before painting.
//!
//! Every call is a pure function of its inputs; the engine holds no state
//! between runs. One call runs single-threaded and synchronously, reporting
//! progress through an optional [`ProgressObserver`] that may also request
//! cancellation at step boundaries.
//!
//! ```
//! use kirinuki::{ConfidenceMatrix, Pixel, PixelBuffer, segment};
//!
//! // A 2×2 image: left column blue (background), right column red.
//! let blue = Pixel::from_argb(0xFF00_00FF);
//! let red = Pixel::from_argb(0xFFFF_0000);
//! let image = PixelBuffer::from_pixels(2, 2, vec![blue, red, blue, red]);
//!
//! // Hints: one certain-background stroke, one certain-foreground stroke,
//! // everything else unknown.
//! let mut confidence = ConfidenceMatrix::new(2, 2);
//! confidence.set(0, 0, ConfidenceMatrix::CERTAIN_BACKGROUND);
//! confidence.set(1, 1, ConfidenceMatrix::CERTAIN_FOREGROUND);
//!
//! let fill = Pixel::from_argb(0x0000_0000);
//! let result = segment(&image, confidence, fill, None)?;
//! assert_eq!(result.dimensions(), image.dimensions());
//! # Ok::<(), kirinuki::SegmentationError>(())
//! ```

mod classify;
pub mod color;
pub mod morphology;
pub mod ppm;
pub mod regions;
pub mod signature;
pub mod types;

pub use color::CieLab;
pub use ppm::{write_ppm, write_ppm_file};
pub use signature::{CLUSTER_LIMITS, CLUSTER_SIZE, create_signature};
pub use types::{
    ConfidenceMatrix, Dimensions, Pixel, PixelBuffer, ProgressObserver, RgbaImage,
    SegmentationError, SegmentationRequest,
};

/// Weight of each tap in the pipeline's confidence smoothing pass.
const SMOOTH_WEIGHT: f32 = 1.0 / 3.0;

/// Report a checkpoint to the observer and honor a cancellation request.
fn checkpoint(
    observer: &mut Option<&mut dyn ProgressObserver>,
    completed_steps: u8,
) -> Result<(), SegmentationError> {
    if let Some(obs) = observer.as_deref_mut() {
        let percent = f32::from(completed_steps) * 10.0;
        if !obs.on_progress(percent) {
            let error = SegmentationError::Cancelled { percent };
            obs.on_error(&error.to_string());
            return Err(error);
        }
    }
    Ok(())
}

/// Report a failure message to the observer, then hand the error back.
fn fail(
    observer: &mut Option<&mut dyn ProgressObserver>,
    error: SegmentationError,
) -> SegmentationError {
    if let Some(obs) = observer.as_deref_mut() {
        obs.on_error(&error.to_string());
    }
    error
}

/// Extract the foreground of `image` according to the hints in
/// `confidence`, returning a copy with all background pixels replaced by
/// `fill_color`.
///
/// `confidence` is consumed and mutated through every stage; on failure it
/// is simply dropped (its intermediate state carries no contract). The
/// input image is never modified. The steps below run strictly in order;
/// after each of steps 1–10 the observer is notified and may cancel.
///
/// # Errors
///
/// Returns [`SegmentationError::InvalidSignature`] when no pixel is hinted
/// at or below [`ConfidenceMatrix::BACKGROUND`] -- without background
/// samples classification is impossible. Returns
/// [`SegmentationError::Cancelled`] when the observer requests
/// cancellation at a checkpoint. A failed call never returns degraded
/// output.
///
/// # Panics
///
/// Panics if `image` and `confidence` dimensions differ; matching
/// dimensions are the caller's responsibility by construction.
pub fn segment(
    image: &PixelBuffer,
    mut confidence: ConfidenceMatrix,
    fill_color: Pixel,
    mut observer: Option<&mut dyn ProgressObserver>,
) -> Result<PixelBuffer, SegmentationError> {
    assert!(
        image.dimensions() == confidence.dimensions(),
        "image dimensions {:?} do not match confidence dimensions {:?}",
        image.dimensions(),
        confidence.dimensions(),
    );

    // 1. Convert the image to Lab once; collect hinted samples. The
    //    per-pixel Lab values are reused by classification (step 3) and
    //    region growth (step 9).
    let labs: Vec<CieLab> = image
        .as_slice()
        .iter()
        .map(|&pixel| CieLab::from_pixel(pixel))
        .collect();
    let mut known_background = Vec::new();
    let mut known_foreground = Vec::new();
    for (lab, &conf) in labs.iter().zip(confidence.as_slice()) {
        if conf <= ConfidenceMatrix::BACKGROUND {
            known_background.push(*lab);
        } else if conf >= ConfidenceMatrix::FOREGROUND {
            known_foreground.push(*lab);
        }
    }
    checkpoint(&mut observer, 1)?;

    // 2. Cluster the samples into color signatures. A missing foreground
    //    signature has a classification fallback; a missing background
    //    signature is fatal.
    let bg_signature = signature::create_signature(&known_background);
    let fg_signature = signature::create_signature(&known_foreground);
    if bg_signature.is_empty() {
        return Err(fail(&mut observer, SegmentationError::InvalidSignature));
    }
    checkpoint(&mut observer, 2)?;

    // 3. Collapse every cell to a certain level by nearest signature.
    classify::classify_pixels(
        &mut confidence,
        image.as_slice(),
        &labs,
        &bg_signature,
        &fg_signature,
    );
    checkpoint(&mut observer, 3)?;

    // 4. Smooth, rescale, then shave one pixel off confident borders.
    morphology::smooth(&mut confidence, SMOOTH_WEIGHT, SMOOTH_WEIGHT, SMOOTH_WEIGHT);
    morphology::normalize(&mut confidence);
    morphology::erode(&mut confidence);
    checkpoint(&mut observer, 4)?;

    // 5. Drop small confidence islands.
    regions::keep_only_large_components(&mut confidence, ConfidenceMatrix::UNKNOWN, 1.0);
    checkpoint(&mut observer, 5)?;

    // 6. Rescale again after the pruning pass.
    morphology::normalize(&mut confidence);
    checkpoint(&mut observer, 6)?;

    // 7. Hard threshold back to certain levels.
    for value in confidence.as_mut_slice() {
        *value = if *value >= ConfidenceMatrix::UNKNOWN {
            ConfidenceMatrix::CERTAIN_FOREGROUND
        } else {
            ConfidenceMatrix::CERTAIN_BACKGROUND
        };
    }
    checkpoint(&mut observer, 7)?;

    // 8. Prune again, slightly more permissive toward mid-sized regions.
    regions::keep_only_large_components(&mut confidence, ConfidenceMatrix::UNKNOWN, 1.5);
    checkpoint(&mut observer, 8)?;

    // 9. Grow surviving foreground through same-colored neighbors.
    regions::grow_matching_color_regions(&mut confidence, &labs);
    checkpoint(&mut observer, 9)?;

    // 10. Close single-pixel holes left by the pruning passes.
    morphology::dilate(&mut confidence);
    checkpoint(&mut observer, 10)?;

    // 11. Paint: background pixels take the fill color, foreground pixels
    //     keep their original color.
    let mut result = image.clone();
    for (pixel, &conf) in result.as_mut_slice().iter_mut().zip(confidence.as_slice()) {
        if conf < ConfidenceMatrix::FOREGROUND {
            *pixel = fill_color;
        }
    }
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const RED: Pixel = Pixel::from_argb(0xFFFF_0000);
    const GREEN: Pixel = Pixel::from_argb(0xFF00_FF00);
    const BLUE: Pixel = Pixel::from_argb(0xFF00_00FF);
    const FILL: Pixel = Pixel::from_argb(0xFF80_8080);

    /// Observer that records every callback and optionally cancels once a
    /// given percentage is reached.
    #[derive(Default)]
    struct RecordingObserver {
        percents: Vec<f32>,
        errors: Vec<String>,
        cancel_at: Option<f32>,
    }

    impl ProgressObserver for RecordingObserver {
        fn on_progress(&mut self, percent: f32) -> bool {
            self.percents.push(percent);
            match self.cancel_at {
                Some(at) => percent < at,
                None => true,
            }
        }

        fn on_error(&mut self, message: &str) {
            self.errors.push(message.to_owned());
        }
    }

    /// 8×8 fixture: a red 4×4 square on blue, with certain-background
    /// hints along the border and certain-foreground hints in the middle
    /// of the square.
    fn blob_fixture() -> (PixelBuffer, ConfidenceMatrix) {
        let image = PixelBuffer::from_pixels(
            8,
            8,
            (0..64)
                .map(|i| {
                    let (x, y) = (i % 8, i / 8);
                    if (2..6).contains(&x) && (2..6).contains(&y) {
                        RED
                    } else {
                        BLUE
                    }
                })
                .collect(),
        );

        let mut confidence = ConfidenceMatrix::new(8, 8);
        for i in 0..8 {
            confidence.set(i, 0, ConfidenceMatrix::CERTAIN_BACKGROUND);
            confidence.set(i, 7, ConfidenceMatrix::CERTAIN_BACKGROUND);
            confidence.set(0, i, ConfidenceMatrix::CERTAIN_BACKGROUND);
            confidence.set(7, i, ConfidenceMatrix::CERTAIN_BACKGROUND);
        }
        for y in 3..5 {
            for x in 3..5 {
                confidence.set(x, y, ConfidenceMatrix::CERTAIN_FOREGROUND);
            }
        }
        (image, confidence)
    }

    #[test]
    fn blob_is_kept_and_background_is_painted() {
        let (image, confidence) = blob_fixture();
        let result = segment(&image, confidence, FILL, None).unwrap();

        for y in 0..8 {
            for x in 0..8 {
                // The red square survives; the final dilation also keeps a
                // one-pixel blue ring around it; everything else is fill.
                let expected = if (2..6).contains(&x) && (2..6).contains(&y) {
                    RED
                } else if (1..7).contains(&x) && (1..7).contains(&y) {
                    BLUE
                } else {
                    FILL
                };
                assert_eq!(result.get(x, y), expected, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn identical_inputs_produce_identical_outputs() {
        let (image, confidence) = blob_fixture();
        let first = segment(&image, confidence.clone(), FILL, None).unwrap();
        let second = segment(&image, confidence, FILL, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn uniform_image_with_conflicting_seeds_ends_fully_foreground() {
        // Both signatures collapse to the same centroid. Whatever the
        // classifier decides, the same-color growth pass floods the whole
        // uniform image from any surviving foreground seed, so nothing is
        // painted.
        let image = PixelBuffer::from_pixels(4, 4, vec![RED; 16]);
        let mut confidence = ConfidenceMatrix::new(4, 4);
        confidence.set(0, 0, ConfidenceMatrix::CERTAIN_BACKGROUND);
        confidence.set(3, 3, ConfidenceMatrix::CERTAIN_FOREGROUND);

        let result = segment(&image, confidence, FILL, None).unwrap();
        assert_eq!(result, image, "no pixel should be painted");
    }

    #[test]
    fn certain_seeds_only_on_tiny_image_erode_away() {
        // 2×2 with both diagonals fully hinted: the classifier only forces
        // levels, and the erosion pass removes every lone foreground cell
        // at this size, so the whole image is painted.
        let image = PixelBuffer::from_pixels(2, 2, vec![RED, GREEN, GREEN, RED]);
        let confidence = ConfidenceMatrix::from_values(
            2,
            2,
            vec![
                ConfidenceMatrix::CERTAIN_BACKGROUND,
                ConfidenceMatrix::CERTAIN_FOREGROUND,
                ConfidenceMatrix::CERTAIN_FOREGROUND,
                ConfidenceMatrix::CERTAIN_BACKGROUND,
            ],
        );

        let result = segment(&image, confidence, FILL, None).unwrap();
        assert_eq!(result.as_slice(), &[FILL; 4]);
    }

    #[test]
    fn missing_background_hints_is_an_error() {
        let image = PixelBuffer::from_pixels(2, 2, vec![RED; 4]);
        let mut confidence = ConfidenceMatrix::new(2, 2);
        confidence.set(0, 0, ConfidenceMatrix::CERTAIN_FOREGROUND);

        let mut observer = RecordingObserver::default();
        let result = segment(&image, confidence, FILL, Some(&mut observer));
        assert_eq!(result, Err(SegmentationError::InvalidSignature));
        assert_eq!(observer.errors.len(), 1);
        assert!(
            observer.errors[0].contains("background signature"),
            "unexpected message: {}",
            observer.errors[0],
        );
    }

    #[test]
    fn single_pixel_image_segments_without_panicking() {
        let image = PixelBuffer::from_pixels(1, 1, vec![BLUE]);
        let confidence = ConfidenceMatrix::from_values(
            1,
            1,
            vec![ConfidenceMatrix::CERTAIN_BACKGROUND],
        );
        let result = segment(&image, confidence, FILL, None).unwrap();
        assert_eq!(result.as_slice(), &[FILL]);
    }

    #[test]
    fn single_pixel_without_background_hint_is_an_error() {
        let image = PixelBuffer::from_pixels(1, 1, vec![BLUE]);
        let confidence = ConfidenceMatrix::from_values(
            1,
            1,
            vec![ConfidenceMatrix::CERTAIN_FOREGROUND],
        );
        let result = segment(&image, confidence, FILL, None);
        assert_eq!(result, Err(SegmentationError::InvalidSignature));
    }

    #[test]
    fn progress_is_reported_at_every_checkpoint() {
        let (image, confidence) = blob_fixture();
        let mut observer = RecordingObserver::default();
        segment(&image, confidence, FILL, Some(&mut observer)).unwrap();
        let expected: Vec<f32> = (1..=10u8).map(|step| f32::from(step) * 10.0).collect();
        assert_eq!(observer.percents, expected);
        assert!(observer.errors.is_empty());
    }

    #[test]
    fn cancellation_at_first_checkpoint_stops_the_run() {
        let (image, confidence) = blob_fixture();
        let mut observer = RecordingObserver {
            cancel_at: Some(10.0),
            ..RecordingObserver::default()
        };
        let result = segment(&image, confidence, FILL, Some(&mut observer));
        assert_eq!(result, Err(SegmentationError::Cancelled { percent: 10.0 }));
        assert_eq!(observer.percents, vec![10.0]);
        assert_eq!(observer.errors.len(), 1);
    }

    #[test]
    fn cancellation_mid_pipeline_reports_the_checkpoint() {
        let (image, confidence) = blob_fixture();
        let mut observer = RecordingObserver {
            cancel_at: Some(60.0),
            ..RecordingObserver::default()
        };
        let result = segment(&image, confidence, FILL, Some(&mut observer));
        assert_eq!(result, Err(SegmentationError::Cancelled { percent: 60.0 }));
        assert_eq!(
            observer.percents,
            vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0],
        );
    }

    #[test]
    fn request_wrapper_matches_free_function() {
        let (image, confidence) = blob_fixture();
        let direct = segment(&image, confidence.clone(), FILL, None).unwrap();
        let request = SegmentationRequest {
            image,
            confidence,
            fill_color: FILL,
        };
        assert_eq!(request.run(None).unwrap(), direct);
    }

    #[test]
    #[should_panic(expected = "do not match")]
    fn mismatched_dimensions_panic() {
        let image = PixelBuffer::new(2, 2);
        let confidence = ConfidenceMatrix::new(3, 2);
        let _ = segment(&image, confidence, FILL, None);
    }
}
