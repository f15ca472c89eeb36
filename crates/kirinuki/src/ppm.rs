//! Binary PPM debug output.
//!
//! A minimal 24-bit `P6` writer for dumping intermediate or final pixel
//! buffers while debugging. This is a developer aid, not a contractual
//! interchange format -- the embedding application talks to the engine
//! through in-memory buffers only.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::types::PixelBuffer;

/// Write `buffer` as a binary PPM stream: the header
/// `P6 {width} {height} 255\n` followed by raw RGB triples in row-major
/// order. Alpha is not representable in PPM and is dropped.
///
/// # Errors
///
/// Propagates any I/O error from `writer`.
pub fn write_ppm<W: Write>(buffer: &PixelBuffer, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "P6 {} {} 255", buffer.width(), buffer.height())?;

    let mut bytes = Vec::with_capacity(buffer.as_slice().len() * 3);
    for pixel in buffer.as_slice() {
        bytes.push(pixel.red());
        bytes.push(pixel.green());
        bytes.push(pixel.blue());
    }
    writer.write_all(&bytes)
}

/// Write `buffer` as a binary PPM file at `path`.
///
/// # Errors
///
/// Propagates any I/O error from creating or writing the file.
pub fn write_ppm_file<P: AsRef<Path>>(buffer: &PixelBuffer, path: P) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_ppm(buffer, &mut writer)?;
    writer.flush()
}
