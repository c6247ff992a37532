//! Parsing and emission of the TGA header and the vendor ID block.

use crate::parser_helpers::{try_split_off_byte_array, u16_le};
use crate::{WmakeError, WmakeResult};

/// The length of a TGA header is always 18 bytes.
pub const TGA_HEADER_LEN: usize = 18;

/// Emitted files always carry a 46-byte identification block.
pub const ID_BLOCK_LEN: usize = 46;

/// Magic opening the identification block.
pub const ID_MAGIC: [u8; 4] = *b"SOMH";

/// Type code: uncompressed palette image.
pub const TYPE_PALETTE: u8 = 1;
/// Type code: uncompressed truecolor image.
pub const TYPE_TRUECOLOR: u8 = 2;
/// Type code: run-length encoded palette image.
pub const TYPE_RLE_PALETTE: u8 = 9;

/// A parsed TGA header.
///
/// Multi-byte fields are little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct TgaHeader {
  /// Length of the identification block that follows the header.
  pub id_length: u8,
  /// 1 when a colour map is present, else 0.
  pub color_map_type: u8,
  /// One of [`TYPE_PALETTE`], [`TYPE_TRUECOLOR`], [`TYPE_RLE_PALETTE`].
  pub type_code: u8,
  pub palette_origin: u16,
  /// Number of colour-map entries.
  pub palette_length: u16,
  /// Bits per colour-map entry; 32 whenever a palette is present.
  pub palette_entry_bits: u8,
  pub x_origin: u16,
  pub y_origin: u16,
  pub width: u16,
  pub height: u16,
  /// 8 for palette images, 16 or 32 for truecolor.
  pub pixel_depth: u8,
  /// Always 32 in emitted files: top-down row order.
  pub descriptor: u8,
}

impl TgaHeader {
  /// Parses a header off the front of the bytes.
  ///
  /// Validates what every later stage relies on: a known type code, non-zero
  /// dimensions, and the palette flag / entry size agreeing with the type
  /// code.
  pub fn parse(bytes: &[u8]) -> WmakeResult<(TgaHeader, &[u8])> {
    let (head, rest) =
      try_split_off_byte_array::<TGA_HEADER_LEN>(bytes).ok_or(WmakeError::TruncatedStream)?;
    let header = TgaHeader {
      id_length: head[0],
      color_map_type: head[1],
      type_code: head[2],
      palette_origin: u16_le(&head[3..5]),
      palette_length: u16_le(&head[5..7]),
      palette_entry_bits: head[7],
      x_origin: u16_le(&head[8..10]),
      y_origin: u16_le(&head[10..12]),
      width: u16_le(&head[12..14]),
      height: u16_le(&head[14..16]),
      pixel_depth: head[16],
      descriptor: head[17],
    };
    header.validate()?;
    Ok((header, rest))
  }

  fn validate(&self) -> WmakeResult<()> {
    if self.width == 0 || self.height == 0 {
      return Err(WmakeError::MalformedHeader);
    }
    match self.type_code {
      TYPE_PALETTE | TYPE_RLE_PALETTE => {
        if self.color_map_type != 1 || self.palette_entry_bits != 32 {
          return Err(WmakeError::MalformedHeader);
        }
      }
      TYPE_TRUECOLOR => {
        if self.color_map_type != 0 {
          return Err(WmakeError::MalformedHeader);
        }
      }
      _ => return Err(WmakeError::MalformedHeader),
    }
    Ok(())
  }

  /// `width · height`.
  #[inline]
  #[must_use]
  pub fn pixel_count(&self) -> usize {
    usize::from(self.width) * usize::from(self.height)
  }
}

/// The vendor identification block.
///
/// When the block is at least 46 bytes and opens with `SOMH`, bytes 4–5 hold
/// the visible image width. Devices that need 16-pixel-aligned row strides
/// store a padded width in the header; the width here is the one to crop
/// back to after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdBlock {
  /// The authoritative width, when the magic was present.
  pub visible_width: Option<u16>,
}

impl IdBlock {
  /// Reads the block from the raw ID bytes that follow a header.
  #[inline]
  #[must_use]
  pub fn parse(id_bytes: &[u8]) -> Self {
    if id_bytes.len() >= ID_BLOCK_LEN && id_bytes[..4] == ID_MAGIC {
      IdBlock { visible_width: Some(u16_le(&id_bytes[4..6])) }
    } else {
      IdBlock { visible_width: None }
    }
  }
}

/// Appends a truecolor header (type code 2, no colour map).
pub(crate) fn push_truecolor_header(out: &mut Vec<u8>, width: u16, height: u16, depth: u8) {
  out.push(ID_BLOCK_LEN as u8); // ID length
  out.push(0); // no colour map
  out.push(TYPE_TRUECOLOR);
  out.extend_from_slice(&[0; 9]); // colour-map fields, x/y origin
  out.extend_from_slice(&width.to_le_bytes());
  out.extend_from_slice(&height.to_le_bytes());
  out.push(depth);
  out.push(32); // top-down rows
}

/// Appends a palette header (type code 1 or 9, 32-bit colour-map entries,
/// 8-bit indices).
pub(crate) fn push_palette_header(
  out: &mut Vec<u8>, type_code: u8, width: u16, height: u16, palette_len: u16,
) {
  out.push(ID_BLOCK_LEN as u8); // ID length
  out.push(1); // colour map present
  out.push(type_code);
  out.extend_from_slice(&[0, 0]); // colour-map origin
  out.extend_from_slice(&palette_len.to_le_bytes());
  out.push(32); // bits per colour-map entry
  out.extend_from_slice(&[0; 4]); // x/y origin
  out.extend_from_slice(&width.to_le_bytes());
  out.extend_from_slice(&height.to_le_bytes());
  out.push(8); // bits per index
  out.push(32); // top-down rows
}

/// Appends the 46-byte identification block carrying the visible width.
pub(crate) fn push_id_block(out: &mut Vec<u8>, visible_width: u16) {
  out.extend_from_slice(&ID_MAGIC);
  out.extend_from_slice(&visible_width.to_le_bytes());
  out.extend_from_slice(&[0; 40]);
}
