#![forbid(unsafe_code)]

//! Asset pipeline for wearable mini-app and watch-face projects.
//!
//! Small-display devices in this family consume raster assets as a vendor
//! dialect of the Truevision TGA format: an 18-byte TGA header, a 46-byte
//! `SOMH` identification block carrying the authoritative image width, and
//! one of four pixel layouts (16-bit 5-6-5 truecolor, 32-bit truecolor,
//! uncompressed palette, run-length encoded palette). This crate decodes and
//! encodes that dialect bit-exactly, and drives whole-directory conversion
//! between it and PNG:
//!
//! * [`tga`]: the codec itself (header, decoder, encoder).
//! * [`bitmap`] / [`pixels`]: the in-memory RGBA image the codec targets.
//! * [`sniff`]: container detection from the first four bytes of a file.
//! * [`quant`]: lossy colour reduction (with backup) for palette targets.
//! * [`target`] / [`config`]: per-file output selection from filename
//!   conventions and project options.
//! * [`convert`]: the directory-walking driver that picks a conversion
//!   direction and applies it file by file.
//!
//! PNG reading and writing is delegated to the `png` crate behind [`png_io`];
//! nothing in the TGA codec depends on it.

use core::fmt;

pub mod bitmap;
pub mod config;
pub mod convert;
pub mod parser_helpers;
pub mod pixels;
pub mod png_io;
pub mod quant;
pub mod sniff;
pub mod target;
pub mod tga;

pub type WmakeResult<T> = Result<T, WmakeError>;

/// An error from the `wmake` crate.
#[derive(Debug)]
#[non_exhaustive]
pub enum WmakeError {
  /// The TGA type code is unknown, the palette flag or palette entry size
  /// doesn't match the type code, or a declared dimension is zero.
  MalformedHeader,
  /// A truecolor image declared a pixel depth other than 16 or 32.
  UnsupportedDepth(u8),
  /// The data ended before the declared palette or pixel payload did.
  TruncatedStream,
  /// A palette encode was attempted on more than 256 distinct colours.
  PaletteOverflow,
  /// Width or height is zero or doesn't fit the 16-bit header fields.
  DimensionsTooLarge,
  /// An underlying file operation failed.
  Io(std::io::Error),
  /// The PNG decoder rejected the input.
  PngDecode(png::DecodingError),
  /// The PNG encoder failed.
  PngEncode(png::EncodingError),
}

impl fmt::Display for WmakeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WmakeError::MalformedHeader => write!(f, "malformed TGA header"),
      WmakeError::UnsupportedDepth(d) => write!(f, "unsupported truecolor depth: {d}"),
      WmakeError::TruncatedStream => write!(f, "TGA data ended early"),
      WmakeError::PaletteOverflow => write!(f, "more than 256 distinct colours"),
      WmakeError::DimensionsTooLarge => write!(f, "image dimensions do not fit a TGA header"),
      WmakeError::Io(e) => write!(f, "io error: {e}"),
      WmakeError::PngDecode(e) => write!(f, "png decode error: {e}"),
      WmakeError::PngEncode(e) => write!(f, "png encode error: {e}"),
    }
  }
}

impl std::error::Error for WmakeError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      WmakeError::Io(e) => Some(e),
      WmakeError::PngDecode(e) => Some(e),
      WmakeError::PngEncode(e) => Some(e),
      _ => None,
    }
  }
}

impl From<std::io::Error> for WmakeError {
  #[inline]
  fn from(e: std::io::Error) -> Self {
    Self::Io(e)
  }
}
impl From<png::DecodingError> for WmakeError {
  #[inline]
  fn from(e: png::DecodingError) -> Self {
    Self::PngDecode(e)
  }
}
impl From<png::EncodingError> for WmakeError {
  #[inline]
  fn from(e: png::EncodingError) -> Self {
    Self::PngEncode(e)
  }
}

/// The on-disk containers the pipeline moves assets between.
///
/// The four TGA variants are the device-side formats; `Png` is the source
/// (and unpacked) format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize)]
pub enum ImageFormat {
  #[serde(rename = "PNG")]
  Png,
  /// Uncompressed 16-bit 5-6-5 truecolor (type code 2, depth 16).
  #[serde(rename = "TGA-16")]
  Tga16,
  /// Uncompressed 32-bit truecolor (type code 2, depth 32).
  #[serde(rename = "TGA-32")]
  Tga32,
  /// Uncompressed 8-bit palette (type code 1).
  #[serde(rename = "TGA-P")]
  TgaP,
  /// Run-length encoded 8-bit palette (type code 9).
  #[serde(rename = "TGA-RLP")]
  TgaRlp,
}

impl ImageFormat {
  /// Is this one of the two palette-based TGA variants?
  #[inline]
  #[must_use]
  pub const fn is_palette(self) -> bool {
    matches!(self, ImageFormat::TgaP | ImageFormat::TgaRlp)
  }

  /// Is this any TGA variant (as opposed to PNG)?
  #[inline]
  #[must_use]
  pub const fn is_tga(self) -> bool {
    !matches!(self, ImageFormat::Png)
  }
}

impl fmt::Display for ImageFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ImageFormat::Png => "PNG",
      ImageFormat::Tga16 => "TGA-16",
      ImageFormat::Tga32 => "TGA-32",
      ImageFormat::TgaP => "TGA-P",
      ImageFormat::TgaRlp => "TGA-RLP",
    })
  }
}

/// Per-project channel-order convention.
///
/// Some device generations read colormap and truecolor bytes with red and
/// blue swapped, and additionally require palette-image row strides padded
/// to a multiple of 16 pixels. `Alternate` selects that convention; the TGA
/// header then carries the padded width while the `SOMH` ID block keeps the
/// visible one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeMode {
  #[default]
  Default,
  Alternate,
}

impl EncodeMode {
  /// True when red and blue trade places in every stored pixel and palette
  /// entry.
  #[inline]
  #[must_use]
  pub const fn swaps_red_and_blue(self) -> bool {
    matches!(self, EncodeMode::Alternate)
  }
}
