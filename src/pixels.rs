//! The pixel type every decode path lands on.

use bytemuck::{Pod, Zeroable};

/// Red/Green/Blue/Alpha, u8 per channel.
///
/// Every decoder output and encoder input is a flat slice of these, in
/// row-major order. The `Pod` impl lets the PNG boundary and the quantiser
/// view pixel slices as plain bytes without copying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGBA8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl RGBA8 {
  /// Opaque black, used to pad palettes and stride-aligned rows.
  pub const OPAQUE_BLACK: RGBA8 = RGBA8 { r: 0, g: 0, b: 0, a: 255 };

  #[inline]
  #[must_use]
  pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }

  /// The same colour with red and blue traded.
  #[inline]
  #[must_use]
  pub const fn swap_rb(self) -> Self {
    Self { r: self.b, g: self.g, b: self.r, a: self.a }
  }
}

impl From<[u8; 4]> for RGBA8 {
  #[inline]
  fn from([r, g, b, a]: [u8; 4]) -> Self {
    Self { r, g, b, a }
  }
}

impl From<RGBA8> for [u8; 4] {
  #[inline]
  fn from(RGBA8 { r, g, b, a }: RGBA8) -> Self {
    [r, g, b, a]
  }
}
