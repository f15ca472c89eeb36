//! kirinuki-bench: run the segmentation engine on real images.
//!
//! Decodes an input image, builds a seed confidence matrix from a trimap
//! image (or a simple border/center heuristic when none is given), runs
//! [`kirinuki::segment`] with a timing observer, and reports per-run
//! duration plus mask statistics. Useful for:
//!
//! - Measuring engine throughput on representative images
//! - Eyeballing mask quality while tuning hint strokes
//! - Producing PNG/PPM dumps of the extracted foreground
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin kirinuki-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use kirinuki::{ConfidenceMatrix, Pixel, PixelBuffer, ProgressObserver};

/// Run the foreground extraction engine on an image with timing
/// diagnostics.
#[derive(Parser)]
#[command(name = "kirinuki-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG).
    image_path: PathBuf,

    /// Path to a trimap image of the same size: dark pixels (luma ≤ 64)
    /// are certain background, bright pixels (luma ≥ 192) certain
    /// foreground, midtones unknown. Without it, the image border seeds
    /// the background and a centered box seeds the foreground.
    #[arg(long)]
    hints: Option<PathBuf>,

    /// Fill color for background pixels, as RRGGBB or AARRGGBB hex.
    #[arg(long, default_value = "808080")]
    fill: String,

    /// Write the extracted foreground as a PNG file.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the extracted foreground as a binary PPM file.
    #[arg(long)]
    ppm: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Print a progress line at every pipeline checkpoint.
    #[arg(long)]
    progress: bool,
}

/// Observer that optionally echoes checkpoints to stderr; never cancels.
struct BenchObserver {
    echo: bool,
}

impl ProgressObserver for BenchObserver {
    fn on_progress(&mut self, percent: f32) -> bool {
        if self.echo {
            eprintln!("  ... {percent:>5.1}%");
        }
        true
    }

    fn on_error(&mut self, message: &str) {
        eprintln!("engine error: {message}");
    }
}

/// Parse an `RRGGBB` or `AARRGGBB` hex string into a pixel. Six-digit
/// colors are made opaque.
fn parse_fill(hex: &str) -> Result<Pixel, String> {
    let digits = hex.trim_start_matches('#');
    let value = u32::from_str_radix(digits, 16)
        .map_err(|e| format!("invalid fill color {hex:?}: {e}"))?;
    match digits.len() {
        6 => Ok(Pixel::from_argb(0xFF00_0000 | value)),
        8 => Ok(Pixel::from_argb(value)),
        n => Err(format!("fill color must have 6 or 8 hex digits, got {n}")),
    }
}

/// Build the seed matrix from a trimap image.
fn confidence_from_trimap(
    trimap_path: &Path,
    width: u32,
    height: u32,
) -> Result<ConfidenceMatrix, String> {
    let trimap = image::open(trimap_path)
        .map_err(|e| format!("error reading {}: {e}", trimap_path.display()))?
        .to_luma8();
    if trimap.dimensions() != (width, height) {
        return Err(format!(
            "trimap is {}x{} but the image is {width}x{height}",
            trimap.width(),
            trimap.height(),
        ));
    }

    let mut confidence = ConfidenceMatrix::new(width, height);
    for (x, y, &image::Luma([luma])) in trimap.enumerate_pixels() {
        let level = match luma {
            0..=64 => ConfidenceMatrix::CERTAIN_BACKGROUND,
            192..=255 => ConfidenceMatrix::CERTAIN_FOREGROUND,
            _ => ConfidenceMatrix::UNKNOWN,
        };
        confidence.set(x, y, level);
    }
    Ok(confidence)
}

/// Fallback seeds when no trimap is given: the outermost pixel ring is
/// certain background, a centered box covering the middle fifth of each
/// axis is certain foreground, the rest stays unknown.
fn confidence_from_heuristic(width: u32, height: u32) -> ConfidenceMatrix {
    let mut confidence = ConfidenceMatrix::new(width, height);
    for x in 0..width {
        confidence.set(x, 0, ConfidenceMatrix::CERTAIN_BACKGROUND);
        confidence.set(x, height - 1, ConfidenceMatrix::CERTAIN_BACKGROUND);
    }
    for y in 0..height {
        confidence.set(0, y, ConfidenceMatrix::CERTAIN_BACKGROUND);
        confidence.set(width - 1, y, ConfidenceMatrix::CERTAIN_BACKGROUND);
    }
    for y in height * 2 / 5..height * 3 / 5 {
        for x in width * 2 / 5..width * 3 / 5 {
            confidence.set(x, y, ConfidenceMatrix::CERTAIN_FOREGROUND);
        }
    }
    confidence
}

#[allow(clippy::cast_precision_loss)]
fn main() -> ExitCode {
    let cli = Cli::parse();

    let fill = match parse_fill(&cli.fill) {
        Ok(fill) => fill,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let rgba = match image::open(&cli.image_path) {
        Ok(decoded) => decoded.to_rgba8(),
        Err(e) => {
            eprintln!("error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    let buffer = PixelBuffer::from_rgba(&rgba);
    let (width, height) = (buffer.width(), buffer.height());
    if width < 2 || height < 2 {
        eprintln!("image is too small to seed ({width}x{height})");
        return ExitCode::FAILURE;
    }

    let seeds = match cli.hints.as_ref() {
        Some(path) => match confidence_from_trimap(path, width, height) {
            Ok(confidence) => confidence,
            Err(msg) => {
                eprintln!("{msg}");
                return ExitCode::FAILURE;
            }
        },
        None => confidence_from_heuristic(width, height),
    };

    eprintln!("Image: {} ({width}x{height})", cli.image_path.display());
    eprintln!(
        "Seeds: {}",
        cli.hints
            .as_ref()
            .map_or_else(|| "border/center heuristic".to_owned(), |p| p.display().to_string()),
    );
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut result = None;
    let mut total_ms = 0.0;

    for run in 0..cli.runs {
        let mut observer = BenchObserver {
            echo: cli.progress && run == 0,
        };
        let started = Instant::now();
        match kirinuki::segment(&buffer, seeds.clone(), fill, Some(&mut observer)) {
            Ok(extracted) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1e3;
                total_ms += elapsed_ms;
                println!("run {}/{}: {elapsed_ms:.1} ms", run + 1, cli.runs);
                result = Some(extracted);
            }
            Err(e) => {
                eprintln!("segmentation failed: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let Some(extracted) = result else {
        return ExitCode::FAILURE;
    };

    let pixel_count = extracted.dimensions().pixel_count();
    let painted = extracted
        .as_slice()
        .iter()
        .filter(|&&pixel| pixel == fill)
        .count();
    println!();
    println!("average: {:.1} ms", total_ms / cli.runs as f64);
    println!(
        "mask: {painted} of {pixel_count} pixels painted as background ({:.1}%)",
        100.0 * painted as f64 / pixel_count as f64,
    );

    if let Some(ref path) = cli.out {
        if let Err(e) = extracted.to_rgba().save(path) {
            eprintln!("error writing {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = cli.ppm {
        if let Err(e) = kirinuki::write_ppm_file(&extracted, path) {
            eprintln!("error writing {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        eprintln!("wrote {}", path.display());
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn parse_fill_accepts_six_digit_hex() {
        assert_eq!(
            parse_fill("ff8000").unwrap(),
            Pixel::from_argb(0xFFFF_8000),
        );
    }

    #[test]
    fn parse_fill_accepts_eight_digit_hex_and_hash_prefix() {
        assert_eq!(
            parse_fill("#10203040").unwrap(),
            Pixel::from_argb(0x1020_3040),
        );
    }

    #[test]
    fn parse_fill_rejects_other_lengths() {
        assert!(parse_fill("fff").is_err());
        assert!(parse_fill("not-hex").is_err());
    }

    #[test]
    fn heuristic_seeds_border_and_center() {
        let confidence = confidence_from_heuristic(10, 10);
        assert_eq!(confidence.get(0, 0), ConfidenceMatrix::CERTAIN_BACKGROUND);
        assert_eq!(confidence.get(9, 5), ConfidenceMatrix::CERTAIN_BACKGROUND);
        assert_eq!(confidence.get(4, 4), ConfidenceMatrix::CERTAIN_FOREGROUND);
        assert_eq!(confidence.get(2, 2), ConfidenceMatrix::UNKNOWN);
    }
}
