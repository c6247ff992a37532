//! Encoding RGBA bitmaps into the four emitted TGA variants.

use std::collections::HashMap;

use super::header::{
  push_id_block, push_palette_header, push_truecolor_header, ID_BLOCK_LEN, TGA_HEADER_LEN,
  TYPE_PALETTE, TYPE_RLE_PALETTE,
};
use crate::bitmap::Bitmap;
use crate::pixels::RGBA8;
use crate::{EncodeMode, ImageFormat, WmakeError, WmakeResult};

/// Encodes a bitmap as the requested TGA variant.
///
/// Palette variants fail with [`WmakeError::PaletteOverflow`] when the
/// bitmap has more than 256 distinct colours; the conversion driver
/// quantises and retries in that case. In the alternate encode mode,
/// palette-variant rows are stride-padded to a multiple of 16 pixels with
/// opaque black, and the ID block keeps the visible width.
pub fn encode_tga(bitmap: &Bitmap, format: ImageFormat, mode: EncodeMode) -> WmakeResult<Vec<u8>> {
  match format {
    ImageFormat::Tga16 => encode_truecolor(bitmap, 16, mode),
    ImageFormat::Tga32 => encode_truecolor(bitmap, 32, mode),
    ImageFormat::TgaP => encode_palette(bitmap, TYPE_PALETTE, mode),
    ImageFormat::TgaRlp => encode_palette(bitmap, TYPE_RLE_PALETTE, mode),
    // PNG is not a TGA variant; the driver writes PNG through the png
    // boundary instead.
    ImageFormat::Png => Err(WmakeError::MalformedHeader),
  }
}

/// Width and height as the 16-bit header fields, or an error when they
/// don't fit.
fn header_dims(bitmap: &Bitmap) -> WmakeResult<(u16, u16)> {
  let width = u16::try_from(bitmap.width).map_err(|_| WmakeError::DimensionsTooLarge)?;
  let height = u16::try_from(bitmap.height).map_err(|_| WmakeError::DimensionsTooLarge)?;
  if width == 0 || height == 0 {
    return Err(WmakeError::DimensionsTooLarge);
  }
  Ok((width, height))
}

/// 8-bit channel to 5 bits, rounding to nearest.
#[inline]
#[must_use]
const fn pack_5(v: u8) -> u8 {
  ((v as u16 * 31 + 127) / 255) as u8
}

/// 8-bit channel to 6 bits, rounding to nearest.
#[inline]
#[must_use]
const fn pack_6(v: u8) -> u8 {
  ((v as u16 * 63 + 127) / 255) as u8
}

fn encode_truecolor(bitmap: &Bitmap, depth: u8, mode: EncodeMode) -> WmakeResult<Vec<u8>> {
  let (width, height) = header_dims(bitmap)?;
  let bytes_per_pixel = usize::from(depth / 8);
  let mut out =
    Vec::with_capacity(TGA_HEADER_LEN + ID_BLOCK_LEN + bitmap.pixels.len() * bytes_per_pixel);
  push_truecolor_header(&mut out, width, height, depth);
  push_id_block(&mut out, width);

  if depth == 16 {
    for px in bitmap.pixels.iter() {
      let RGBA8 { mut r, g, mut b, .. } = *px;
      if mode.swaps_red_and_blue() {
        core::mem::swap(&mut r, &mut b);
      }
      let r5 = pack_5(r);
      let g6 = pack_6(g);
      let b5 = pack_5(b);
      out.push(((g6 & 0b111) << 5) | b5);
      out.push((r5 << 3) | (g6 >> 3));
    }
  } else {
    for px in bitmap.pixels.iter() {
      let bytes = if mode.swaps_red_and_blue() {
        [px.r, px.g, px.b, px.a]
      } else {
        [px.b, px.g, px.r, px.a]
      };
      out.extend_from_slice(&bytes);
    }
  }
  Ok(out)
}

fn encode_palette(bitmap: &Bitmap, type_code: u8, mode: EncodeMode) -> WmakeResult<Vec<u8>> {
  let (visible_width, _) = header_dims(bitmap)?;

  // Alternate-convention devices read palette rows in 16-pixel strides.
  let padded;
  let img: &Bitmap = if mode == EncodeMode::Alternate && bitmap.width % 16 != 0 {
    let stride_width = bitmap.width.div_ceil(16) * 16;
    padded = bitmap.padded_to_width(stride_width, RGBA8::OPAQUE_BLACK);
    &padded
  } else {
    bitmap
  };
  let (width, height) = header_dims(img)?;

  let palette = PaletteMap::build(img)?;
  let mut out = Vec::with_capacity(
    TGA_HEADER_LEN + ID_BLOCK_LEN + palette.entries.len() * 4 + img.pixels.len(),
  );
  push_palette_header(&mut out, type_code, width, height, palette.entries.len() as u16);
  push_id_block(&mut out, visible_width);
  for entry in palette.entries.iter() {
    let bytes = if mode.swaps_red_and_blue() {
      [entry.r, entry.g, entry.b, entry.a]
    } else {
      [entry.b, entry.g, entry.r, entry.a]
    };
    out.extend_from_slice(&bytes);
  }

  if type_code == TYPE_RLE_PALETTE {
    let mut rle = RlePacketizer::new();
    for px in img.pixels.iter() {
      rle.push(palette.index_of(px));
    }
    out.extend_from_slice(&rle.finish());
  } else {
    for px in img.pixels.iter() {
      out.push(palette.index_of(px));
    }
  }
  Ok(out)
}

/// A palette in first-occurrence order, padded to 256 entries, with a
/// reverse lookup for index emission.
struct PaletteMap {
  entries: Vec<RGBA8>,
  lookup: HashMap<RGBA8, u8>,
}

impl PaletteMap {
  /// Collects the distinct colours of the bitmap in the order they first
  /// appear, failing once a 257th colour shows up.
  fn build(bitmap: &Bitmap) -> WmakeResult<PaletteMap> {
    let mut entries: Vec<RGBA8> = Vec::new();
    let mut lookup: HashMap<RGBA8, u8> = HashMap::new();
    for px in bitmap.pixels.iter() {
      if !lookup.contains_key(px) {
        if entries.len() == 256 {
          return Err(WmakeError::PaletteOverflow);
        }
        lookup.insert(*px, entries.len() as u8);
        entries.push(*px);
      }
    }
    while entries.len() < 256 {
      entries.push(RGBA8::OPAQUE_BLACK);
    }
    Ok(PaletteMap { entries, lookup })
  }

  /// The index of a colour that was present when the palette was built.
  #[inline]
  fn index_of(&self, px: &RGBA8) -> u8 {
    self.lookup[px]
  }
}

/// Packetises palette indices into the run/literal stream of type code 9.
///
/// Packets carry 1 to 128 values each. The header byte of the packet being
/// grown is rewritten in place, so the stream is complete after the last
/// input with no flush step. A literal whose trailing value repeats is
/// split so the pair continues as a run; a run that hits 128 values starts
/// over with a fresh literal.
pub(crate) struct RlePacketizer {
  out: Vec<u8>,
  head: usize,
}

impl RlePacketizer {
  pub(crate) fn new() -> Self {
    RlePacketizer { out: Vec::new(), head: 0 }
  }

  pub(crate) fn push(&mut self, x: u8) {
    if self.out.is_empty() {
      self.out.push(0);
      self.out.push(x);
      return;
    }
    let h = self.out[self.head];
    if h & 0x80 != 0 {
      // run packet: header byte, then the repeated value
      if x == self.out[self.head + 1] && h < 0xFF {
        self.out[self.head] += 1;
      } else {
        self.start_literal(x);
      }
    } else if self.out[self.out.len() - 1] == x {
      // the literal's trailing value repeats: continue as a run of two
      if h == 0 {
        // a one-value literal just turns into the run in place
        self.out[self.head] = 0x81;
      } else {
        self.out[self.head] = h - 1;
        self.head = self.out.len() - 1;
        self.out[self.head] = 0x81;
        self.out.push(x);
      }
    } else if h < 0x7F {
      // room left in the literal
      self.out.push(x);
      self.out[self.head] += 1;
    } else {
      self.start_literal(x);
    }
  }

  fn start_literal(&mut self, x: u8) {
    self.head = self.out.len();
    self.out.push(0);
    self.out.push(x);
  }

  pub(crate) fn finish(self) -> Vec<u8> {
    self.out
  }
}
