//! Decoding the three supported TGA subtypes into RGBA bitmaps.

use super::header::{IdBlock, TgaHeader, TYPE_PALETTE, TYPE_RLE_PALETTE, TYPE_TRUECOLOR};
use crate::bitmap::{Bitmap, Palmap};
use crate::parser_helpers::{try_split_off_byte_array, u16_le};
use crate::pixels::RGBA8;
use crate::{EncodeMode, ImageFormat, WmakeError, WmakeResult};

/// Decodes any supported TGA variant into an RGBA bitmap.
///
/// Returns the bitmap and the exact variant the bytes held (the truecolor
/// depth decides between `Tga16` and `Tga32`). When the `SOMH` ID block
/// carries a narrower width than the header, the stored rows are
/// stride-aligned and the bitmap is cropped back to the visible width.
pub fn decode_tga(bytes: &[u8], mode: EncodeMode) -> WmakeResult<(Bitmap, ImageFormat)> {
  let (header, rest) = TgaHeader::parse(bytes)?;
  if rest.len() < usize::from(header.id_length) {
    return Err(WmakeError::TruncatedStream);
  }
  let (id_bytes, data) = rest.split_at(usize::from(header.id_length));
  let id = IdBlock::parse(id_bytes);

  let (bitmap, format) = match header.type_code {
    TYPE_TRUECOLOR => decode_truecolor(&header, data, mode)?,
    TYPE_PALETTE => {
      let palmap = decode_palette(&header, data, mode, false)?;
      (palmap.to_bitmap(), ImageFormat::TgaP)
    }
    TYPE_RLE_PALETTE => {
      let palmap = decode_palette(&header, data, mode, true)?;
      (palmap.to_bitmap(), ImageFormat::TgaRlp)
    }
    // TgaHeader::parse only lets the three known codes through
    _ => return Err(WmakeError::MalformedHeader),
  };

  let bitmap = match id.visible_width {
    Some(w) if w > 0 && u32::from(w) < bitmap.width => {
      log::debug!("using visible width {w} from the ID block (stored {})", bitmap.width);
      bitmap.cropped_to_width(u32::from(w))
    }
    _ => bitmap,
  };
  Ok((bitmap, format))
}

/// 5-bit channel to 8-bit, rounding to nearest.
#[inline]
#[must_use]
const fn expand_5(v: u8) -> u8 {
  ((v as u16 * 255 + 15) / 31) as u8
}

/// 6-bit channel to 8-bit, rounding to nearest.
#[inline]
#[must_use]
const fn expand_6(v: u8) -> u8 {
  ((v as u16 * 255 + 31) / 63) as u8
}

fn decode_truecolor(
  header: &TgaHeader, data: &[u8], mode: EncodeMode,
) -> WmakeResult<(Bitmap, ImageFormat)> {
  let count = header.pixel_count();
  let (bytes_per_pixel, format) = match header.pixel_depth {
    16 => (2_usize, ImageFormat::Tga16),
    32 => (4_usize, ImageFormat::Tga32),
    d => return Err(WmakeError::UnsupportedDepth(d)),
  };
  // check the payload before reserving pixel memory, so a hostile header
  // can't demand gigabytes
  let need = count.saturating_mul(bytes_per_pixel);
  if data.len() < need {
    return Err(WmakeError::TruncatedStream);
  }

  let mut pixels: Vec<RGBA8> = Vec::with_capacity(count);
  if format == ImageFormat::Tga16 {
    for word in data[..need].chunks_exact(2) {
      let v = u16_le(word);
      let mut red = expand_5((v >> 11) as u8);
      let green = expand_6(((v >> 5) & 0x3F) as u8);
      let mut blue = expand_5((v & 0x1F) as u8);
      if mode.swaps_red_and_blue() {
        core::mem::swap(&mut red, &mut blue);
      }
      pixels.push(RGBA8::new(red, green, blue, 255));
    }
  } else {
    for quad in data[..need].chunks_exact(4) {
      let px = if mode.swaps_red_and_blue() {
        RGBA8::new(quad[0], quad[1], quad[2], quad[3]) // stored R,G,B,A
      } else {
        RGBA8::new(quad[2], quad[1], quad[0], quad[3]) // stored B,G,R,A
      };
      pixels.push(px);
    }
  }
  let bitmap =
    Bitmap { width: u32::from(header.width), height: u32::from(header.height), pixels };
  Ok((bitmap, format))
}

fn decode_palette(
  header: &TgaHeader, data: &[u8], mode: EncodeMode, rle: bool,
) -> WmakeResult<Palmap> {
  log::debug!(
    "palette_length={}, size={}x{}",
    header.palette_length,
    header.width,
    header.height
  );
  let mut rest = data;
  let mut palette: Vec<RGBA8> = Vec::with_capacity(usize::from(header.palette_length));
  for _ in 0..header.palette_length {
    let ([c0, c1, c2, c3], r) =
      try_split_off_byte_array::<4>(rest).ok_or(WmakeError::TruncatedStream)?;
    rest = r;
    let px = if mode.swaps_red_and_blue() {
      RGBA8::new(c0, c1, c2, c3) // stored R,G,B,A
    } else {
      RGBA8::new(c2, c1, c0, c3) // stored B,G,R,A
    };
    palette.push(px);
  }

  let count = header.pixel_count();
  let indexes = if rle { read_rle_indexes(rest, count)? } else { read_raw_indexes(rest, count)? };
  Ok(Palmap {
    width: u32::from(header.width),
    height: u32::from(header.height),
    indexes,
    palette,
  })
}

fn read_raw_indexes(data: &[u8], count: usize) -> WmakeResult<Vec<u8>> {
  if data.len() < count {
    return Err(WmakeError::TruncatedStream);
  }
  Ok(data[..count].to_vec())
}

/// Reads run/literal packets until `count` indices have been produced.
///
/// A packet header's top bit selects run vs literal; the low seven bits hold
/// `count - 1`. A run is followed by one index byte, a literal by `count`
/// index bytes.
pub(crate) fn read_rle_indexes(data: &[u8], count: usize) -> WmakeResult<Vec<u8>> {
  // a 2-byte run packet yields at most 128 values, so the data bounds what
  // the reserve can ever need
  let mut indexes: Vec<u8> = Vec::with_capacity(count.min(data.len().saturating_mul(128)));
  let mut rest = data;
  while indexes.len() < count {
    let ([head], r) = try_split_off_byte_array::<1>(rest).ok_or(WmakeError::TruncatedStream)?;
    rest = r;
    let run = usize::from(head & 0x7F) + 1;
    if head & 0x80 != 0 {
      let ([index], r) = try_split_off_byte_array::<1>(rest).ok_or(WmakeError::TruncatedStream)?;
      rest = r;
      indexes.resize(indexes.len() + run, index);
    } else {
      if rest.len() < run {
        return Err(WmakeError::TruncatedStream);
      }
      let (values, r) = rest.split_at(run);
      indexes.extend_from_slice(values);
      rest = r;
    }
  }
  indexes.truncate(count);
  Ok(indexes)
}
