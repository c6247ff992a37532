//! The boundary with the external PNG codec.
//!
//! Everything the crate needs from PNG lives behind these two functions, so
//! the TGA codec itself never sees the `png` crate.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use bytemuck::cast_slice;

use crate::bitmap::Bitmap;
use crate::pixels::RGBA8;
use crate::{WmakeError, WmakeResult};

/// Reads a PNG into an RGBA bitmap, whatever its stored colour type.
pub fn read_png(path: &Path) -> WmakeResult<Bitmap> {
  let mut decoder = png::Decoder::new(BufReader::new(File::open(path)?));
  decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
  let mut reader = decoder.read_info()?;
  let mut buf = vec![0_u8; reader.output_buffer_size()];
  let info = reader.next_frame(&mut buf)?;
  let data = &buf[..info.buffer_size()];

  let pixels: Vec<RGBA8> = match info.color_type {
    png::ColorType::Rgba => {
      data.chunks_exact(4).map(|c| RGBA8::new(c[0], c[1], c[2], c[3])).collect()
    }
    png::ColorType::Rgb => data.chunks_exact(3).map(|c| RGBA8::new(c[0], c[1], c[2], 255)).collect(),
    png::ColorType::Grayscale => data.iter().map(|&y| RGBA8::new(y, y, y, 255)).collect(),
    png::ColorType::GrayscaleAlpha => {
      data.chunks_exact(2).map(|c| RGBA8::new(c[0], c[0], c[0], c[1])).collect()
    }
    // the expand transformation de-indexes palettes before we see them
    png::ColorType::Indexed => return Err(WmakeError::MalformedHeader),
  };
  Ok(Bitmap { width: info.width, height: info.height, pixels })
}

/// Writes an RGBA bitmap as an 8-bit RGBA PNG, replacing any existing file.
pub fn write_png(path: &Path, bitmap: &Bitmap) -> WmakeResult<()> {
  let file = File::create(path)?;
  let mut encoder = png::Encoder::new(BufWriter::new(file), bitmap.width, bitmap.height);
  encoder.set_color(png::ColorType::Rgba);
  encoder.set_depth(png::BitDepth::Eight);
  let mut writer = encoder.write_header()?;
  writer.write_image_data(cast_slice(&bitmap.pixels))?;
  writer.finish()?;
  Ok(())
}
