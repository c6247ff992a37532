//! Lossy colour reduction for palette targets.
//!
//! Palette variants hold at most 256 colours. Sources over that limit are
//! reduced here, after a best-effort backup of the original so nothing is
//! lost when files are converted in place.

use std::path::Path;

use bytemuck::cast_slice;
use chrono::Local;
use color_quant::NeuQuant;

use crate::bitmap::Bitmap;
use crate::pixels::RGBA8;
use crate::png_io;

// NeuQuant sampling factor: 1 is most exact, 30 is fastest.
const SAMPLE_FACTOR: i32 = 3;

/// Reduces a bitmap to at most 256 distinct colours.
///
/// Fully opaque sources come back fully opaque; sources with transparent
/// parts are reduced in RGBA space so the result keeps their alpha.
#[must_use]
pub fn quantize(bitmap: &Bitmap) -> Bitmap {
  let opaque = bitmap.is_fully_opaque();
  let quant = NeuQuant::new(SAMPLE_FACTOR, 256, cast_slice(&bitmap.pixels));
  let map = quant.color_map_rgba();
  let pixels: Vec<RGBA8> = bitmap
    .pixels
    .iter()
    .map(|px| {
      let i = quant.index_of(&[px.r, px.g, px.b, px.a]) * 4;
      let a = if opaque { 255 } else { map[i + 3] };
      RGBA8::new(map[i], map[i + 1], map[i + 2], a)
    })
    .collect();
  Bitmap { width: bitmap.width, height: bitmap.height, pixels }
}

/// Saves the un-reduced image into the backup directory.
///
/// Best-effort: a backup that can't be written is logged and skipped, never
/// an error. Names carry a microsecond timestamp, so collisions are not a
/// practical concern.
pub fn backup_original(bitmap: &Bitmap, source: &Path, backup_dir: &Path) {
  if let Err(e) = std::fs::create_dir_all(backup_dir) {
    log::warn!("can't create backup dir {}: {e}", backup_dir.display());
    return;
  }
  let name = match source.file_name() {
    Some(n) => n.to_string_lossy().into_owned(),
    None => String::from("image.png"),
  };
  let stamp = Local::now().format("%Y-%m-%d_%H%M%S%.6f");
  let dest = backup_dir.join(format!("{stamp}__{name}"));
  match png_io::write_png(&dest, bitmap) {
    Ok(()) => log::info!("backup at {}", dest.display()),
    Err(e) => log::warn!("backup failed for {}: {e}", dest.display()),
  }
}

/// Backs up (when the source path is known) and quantises.
#[must_use]
pub fn compress_colors(bitmap: &Bitmap, source: Option<&Path>, backup_dir: &Path) -> Bitmap {
  if let Some(path) = source {
    log::warn!("colour compression applied: {}", path.display());
    if !bitmap.is_fully_opaque() {
      log::warn!("colour compression applied to an image with transparent parts");
    }
    backup_original(bitmap, path, backup_dir);
  }
  quantize(bitmap)
}
