//! Shared types for the kirinuki segmentation engine.
//!
//! The engine is sans-IO: it operates on an in-memory [`PixelBuffer`] and a
//! parallel [`ConfidenceMatrix`] and never touches files or decodes image
//! formats. The embedding application converts its native bitmaps to and
//! from these types (see [`PixelBuffer::from_rgba`] / [`PixelBuffer::to_rgba`])
//! and paints user hint strokes into the confidence matrix before calling
//! [`segment`](crate::segment).

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can bridge raster data
/// without depending on `image` directly.
pub use image::RgbaImage;

/// A packed ARGB pixel: 8 bits per channel, alpha in the high byte.
///
/// Pixels are immutable plain data; all engine stages read them and only
/// the final paint step replaces them wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pixel(u32);

impl Pixel {
    /// Create a pixel from a packed `0xAARRGGBB` value.
    #[must_use]
    pub const fn from_argb(argb: u32) -> Self {
        Self(argb)
    }

    /// Create a pixel from individual channel values.
    #[must_use]
    pub const fn from_channels(alpha: u8, red: u8, green: u8, blue: u8) -> Self {
        Self(
            ((alpha as u32) << 24) | ((red as u32) << 16) | ((green as u32) << 8) | (blue as u32),
        )
    }

    /// The packed `0xAARRGGBB` value.
    #[must_use]
    pub const fn argb(self) -> u32 {
        self.0
    }

    /// The alpha channel (0 = transparent, 255 = opaque).
    #[must_use]
    pub const fn alpha(self) -> u8 {
        ((self.0 >> 24) & 0xFF) as u8
    }

    /// The red channel.
    #[must_use]
    pub const fn red(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// The green channel.
    #[must_use]
    pub const fn green(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// The blue channel.
    #[must_use]
    pub const fn blue(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels (`width × height`).
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// An owned raster image: a `width × height` array of packed [`Pixel`]s in
/// row-major order.
///
/// Accessors are bounds-checked and panic on out-of-range coordinates --
/// internal call sites stay in bounds by construction, so an out-of-range
/// access is a programming error rather than a recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl PixelBuffer {
    /// Create a buffer of the given size filled with transparent black.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::default(); width as usize * height as usize],
        }
    }

    /// Create a buffer from an existing row-major pixel vector.
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len() != width * height`.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Pixel>) -> Self {
        assert!(
            pixels.len() == width as usize * height as usize,
            "pixel vector length {} does not match {width}x{height}",
            pixels.len(),
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert a decoded RGBA image into a packed pixel buffer.
    #[must_use]
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let pixels = image
            .pixels()
            .map(|image::Rgba([r, g, b, a])| Pixel::from_channels(*a, *r, *g, *b))
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    /// Convert this buffer back into an RGBA image.
    #[must_use]
    pub fn to_rgba(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let p = self.get(x, y);
            image::Rgba([p.red(), p.green(), p.blue(), p.alpha()])
        })
    }

    /// Buffer dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Pixel {
        assert!(
            x < self.width && y < self.height,
            "pixel access out of bounds: ({x},{y}) outside {}x{}",
            self.width,
            self.height,
        );
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Overwrite the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    pub fn set(&mut self, x: u32, y: u32, pixel: Pixel) {
        assert!(
            x < self.width && y < self.height,
            "pixel access out of bounds: ({x},{y}) outside {}x{}",
            self.width,
            self.height,
        );
        self.pixels[y as usize * self.width as usize + x as usize] = pixel;
    }

    /// All pixels in row-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[Pixel] {
        &self.pixels
    }

    /// All pixels in row-major order, mutable.
    pub fn as_mut_slice(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }
}

/// Per-pixel foreground confidence, same dimensions as the image.
///
/// Values live in `[0, 1]`: 0 = certainly background, 1 = certainly
/// foreground. The matrix is mutated in place through every pipeline stage.
/// Seed matrices use the named level constants; several stages depend on
/// cells holding those levels *exactly*, so callers must not write
/// approximations of them.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceMatrix {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl ConfidenceMatrix {
    /// Confidence of a certain background region.
    pub const CERTAIN_BACKGROUND: f32 = 0.0;

    /// Confidence of a region likely being background.
    pub const BACKGROUND: f32 = 0.1;

    /// Confidence for foreground and background being equally likely.
    pub const UNKNOWN: f32 = 0.5;

    /// Confidence of a region likely being foreground.
    pub const FOREGROUND: f32 = 0.8;

    /// Confidence of a certain foreground region.
    pub const CERTAIN_FOREGROUND: f32 = 1.0;

    /// Create a matrix of the given size with every cell [`Self::UNKNOWN`].
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![Self::UNKNOWN; width as usize * height as usize],
        }
    }

    /// Create a matrix from an existing row-major value vector.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != width * height`.
    #[must_use]
    pub fn from_values(width: u32, height: u32, values: Vec<f32>) -> Self {
        assert!(
            values.len() == width as usize * height as usize,
            "confidence vector length {} does not match {width}x{height}",
            values.len(),
        );
        Self {
            width,
            height,
            values,
        }
    }

    /// Matrix dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The confidence at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        assert!(
            x < self.width && y < self.height,
            "confidence access out of bounds: ({x},{y}) outside {}x{}",
            self.width,
            self.height,
        );
        self.values[y as usize * self.width as usize + x as usize]
    }

    /// Overwrite the confidence at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    pub fn set(&mut self, x: u32, y: u32, confidence: f32) {
        assert!(
            x < self.width && y < self.height,
            "confidence access out of bounds: ({x},{y}) outside {}x{}",
            self.width,
            self.height,
        );
        self.values[y as usize * self.width as usize + x as usize] = confidence;
    }

    /// All values in row-major order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// All values in row-major order, mutable.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.values
    }
}

/// Callback interface for progress reporting and cancellation.
///
/// [`segment`](crate::segment) reports after each pipeline step and checks
/// the return value of [`on_progress`](Self::on_progress) only at those
/// checkpoints -- a long-running step cannot be interrupted mid-flight.
pub trait ProgressObserver {
    /// Called with the completed percentage (0–100). Return `false` to
    /// request cancellation at this checkpoint.
    fn on_progress(&mut self, percent: f32) -> bool;

    /// Called with a human-readable message when the run fails or is
    /// cancelled, immediately before the error is returned.
    fn on_error(&mut self, message: &str);
}

/// Errors surfaced by [`segment`](crate::segment).
///
/// A failed run never returns degraded output; the caller's last-good state
/// is untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum SegmentationError {
    /// No pixel was marked at or below [`ConfidenceMatrix::BACKGROUND`], so
    /// the background signature came out empty and classification is
    /// impossible.
    #[error("background signature is empty; segmentation is impossible")]
    InvalidSignature,

    /// The observer requested cancellation at a checkpoint. Distinct from
    /// other failures so callers can retry silently.
    #[error("segmentation cancelled at {percent}%")]
    Cancelled {
        /// Pipeline percentage at the checkpoint that observed the request.
        percent: f32,
    },
}

/// A complete segmentation job: image, seed confidence, and fill color.
///
/// Thin convenience wrapper over [`segment`](crate::segment) for callers
/// that queue jobs (e.g. a worker thread owned by the editor).
#[derive(Debug, Clone)]
pub struct SegmentationRequest {
    /// The input image; read, never modified.
    pub image: PixelBuffer,
    /// Seed confidence; consumed and mutated through every stage.
    pub confidence: ConfidenceMatrix,
    /// Color painted over background pixels in the result.
    pub fill_color: Pixel,
}

impl SegmentationRequest {
    /// Run the segmentation pipeline for this request.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentationError::InvalidSignature`] if no background
    /// samples exist, or [`SegmentationError::Cancelled`] if the observer
    /// requested cancellation.
    pub fn run(
        self,
        observer: Option<&mut dyn ProgressObserver>,
    ) -> Result<PixelBuffer, SegmentationError> {
        crate::segment(&self.image, self.confidence, self.fill_color, observer)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;

    // --- Pixel tests ---

    #[test]
    fn pixel_packs_and_unpacks_channels() {
        let p = Pixel::from_channels(0x12, 0x34, 0x56, 0x78);
        assert_eq!(p.argb(), 0x1234_5678);
        assert_eq!(p.alpha(), 0x12);
        assert_eq!(p.red(), 0x34);
        assert_eq!(p.green(), 0x56);
        assert_eq!(p.blue(), 0x78);
    }

    #[test]
    fn pixel_from_argb_round_trips() {
        let p = Pixel::from_argb(0xFFAB_CDEF);
        assert_eq!(
            Pixel::from_channels(p.alpha(), p.red(), p.green(), p.blue()),
            p,
        );
    }

    // --- PixelBuffer tests ---

    #[test]
    fn buffer_get_set() {
        let mut buf = PixelBuffer::new(3, 2);
        let red = Pixel::from_argb(0xFFFF_0000);
        buf.set(2, 1, red);
        assert_eq!(buf.get(2, 1), red);
        assert_eq!(buf.get(0, 0), Pixel::default());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn buffer_get_out_of_bounds_panics() {
        let buf = PixelBuffer::new(3, 2);
        let _ = buf.get(3, 0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn buffer_set_out_of_bounds_panics() {
        let mut buf = PixelBuffer::new(3, 2);
        buf.set(0, 2, Pixel::default());
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn buffer_from_pixels_rejects_wrong_length() {
        let _ = PixelBuffer::from_pixels(2, 2, vec![Pixel::default(); 3]);
    }

    #[test]
    fn buffer_rgba_round_trip() {
        let image = RgbaImage::from_fn(4, 3, |x, y| {
            image::Rgba([x as u8, y as u8, (x + y) as u8, 255])
        });
        let buf = PixelBuffer::from_rgba(&image);
        assert_eq!(buf.width(), 4);
        assert_eq!(buf.height(), 3);
        assert_eq!(buf.get(3, 2), Pixel::from_channels(255, 3, 2, 5));
        assert_eq!(buf.to_rgba(), image);
    }

    // --- ConfidenceMatrix tests ---

    #[test]
    fn confidence_levels_are_exact() {
        assert_eq!(ConfidenceMatrix::CERTAIN_BACKGROUND, 0.0);
        assert_eq!(ConfidenceMatrix::BACKGROUND, 0.1);
        assert_eq!(ConfidenceMatrix::UNKNOWN, 0.5);
        assert_eq!(ConfidenceMatrix::FOREGROUND, 0.8);
        assert_eq!(ConfidenceMatrix::CERTAIN_FOREGROUND, 1.0);
    }

    #[test]
    fn new_matrix_is_unknown_everywhere() {
        let cm = ConfidenceMatrix::new(3, 3);
        assert!(
            cm.as_slice()
                .iter()
                .all(|&v| v == ConfidenceMatrix::UNKNOWN),
        );
    }

    #[test]
    fn matrix_get_set() {
        let mut cm = ConfidenceMatrix::new(2, 2);
        cm.set(1, 0, ConfidenceMatrix::CERTAIN_FOREGROUND);
        assert_eq!(cm.get(1, 0), ConfidenceMatrix::CERTAIN_FOREGROUND);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn matrix_out_of_bounds_panics() {
        let cm = ConfidenceMatrix::new(2, 2);
        let _ = cm.get(0, 5);
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn matrix_from_values_rejects_wrong_length() {
        let _ = ConfidenceMatrix::from_values(2, 2, vec![0.0; 5]);
    }

    // --- Dimensions tests ---

    #[test]
    fn dimensions_pixel_count() {
        let d = Dimensions {
            width: 640,
            height: 480,
        };
        assert_eq!(d.pixel_count(), 307_200);
    }

    // --- Serde round-trip tests ---

    #[test]
    fn dimensions_serde_round_trip() {
        let d = Dimensions {
            width: 12,
            height: 34,
        };
        let json = serde_json::to_string(&d).unwrap();
        let back: Dimensions = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }

    #[test]
    fn pixel_serde_round_trip() {
        let p = Pixel::from_argb(0x8040_2010);
        let json = serde_json::to_string(&p).unwrap();
        let back: Pixel = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn error_serde_round_trip() {
        let err = SegmentationError::Cancelled { percent: 40.0 };
        let json = serde_json::to_string(&err).unwrap();
        let back: SegmentationError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn error_display_messages() {
        assert_eq!(
            SegmentationError::InvalidSignature.to_string(),
            "background signature is empty; segmentation is impossible",
        );
        assert_eq!(
            SegmentationError::Cancelled { percent: 30.0 }.to_string(),
            "segmentation cancelled at 30%",
        );
    }
}
