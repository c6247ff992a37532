//! Just has shorthands for various byte parsing things you'd want to do.

#[inline]
#[must_use]
pub fn u16_le(bytes: &[u8]) -> u16 {
  u16::from_le_bytes(bytes.try_into().unwrap())
}

/// Splits a fixed-size array off the front of the bytes, or `None` when
/// there aren't enough bytes left.
pub fn try_split_off_byte_array<const N: usize>(bytes: &[u8]) -> Option<([u8; N], &[u8])> {
  if bytes.len() >= N {
    let (head, tail) = bytes.split_at(N);
    let a: [u8; N] = head.try_into().unwrap();
    Some((a, tail))
  } else {
    None
  }
}
