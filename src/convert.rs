//! The directory conversion driver.
//!
//! Given a directory (or a single file), classify everything by container,
//! infer the conversion direction, and apply it file by file, overwriting
//! sources in place. A mixed directory (some PNG, some TGA) needs the user
//! to pick a direction, which arrives through the injected [`Prompt`].

use core::fmt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::bitmap::Bitmap;
use crate::config::Config;
use crate::png_io;
use crate::quant;
use crate::sniff::{sniff_file, FileKind};
use crate::target::target_format;
use crate::tga;
use crate::{ImageFormat, WmakeError, WmakeResult};

/// Which way a conversion pass moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  /// PNG sources become TGA assets.
  Encode,
  /// TGA assets become PNG sources.
  Decode,
}

/// The one user decision the driver can need: picking a direction for a
/// mixed directory. Tests script it; the binary asks on the console.
pub trait Prompt {
  /// Presents `question` with the given options, returning the index of the
  /// chosen one.
  fn choose(&mut self, question: &str, options: &[&str]) -> std::io::Result<usize>;
}

/// How many files each pass wrote, per target, plus how many it skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertStats {
  saved: BTreeMap<ImageFormat, u32>,
  /// Non-image files plus files already in their target format.
  pub skipped: u32,
}

impl ConvertStats {
  fn bump(&mut self, format: ImageFormat) {
    *self.saved.entry(format).or_insert(0) += 1;
  }

  /// How many files were written in the given format.
  #[inline]
  #[must_use]
  pub fn saved(&self, format: ImageFormat) -> u32 {
    self.saved.get(&format).copied().unwrap_or(0)
  }

  /// How many files were written in total.
  #[must_use]
  pub fn total_saved(&self) -> u32 {
    self.saved.values().sum()
  }
}

impl fmt::Display for ConvertStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.saved.is_empty() {
      write!(f, "nothing converted")?;
    } else {
      let mut first = true;
      for (format, count) in self.saved.iter() {
        if !first {
          write!(f, ", ")?;
        }
        write!(f, "{format}: {count}")?;
        first = false;
      }
    }
    write!(f, " ({} skipped)", self.skipped)
  }
}

/// A failed conversion pass.
#[derive(Debug)]
pub enum DriveError {
  /// A file failed to convert; the pass stopped there and nothing after it
  /// was touched.
  File {
    /// The offending file.
    path: PathBuf,
    /// What went wrong with it.
    error: WmakeError,
  },
  /// The interactive direction choice failed (e.g. stdin closed).
  Prompt(std::io::Error),
}

impl fmt::Display for DriveError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DriveError::File { path, error } => write!(f, "{}: {error}", path.display()),
      DriveError::Prompt(e) => write!(f, "direction choice failed: {e}"),
    }
  }
}

impl std::error::Error for DriveError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      DriveError::File { error, .. } => Some(error),
      DriveError::Prompt(e) => Some(e),
    }
  }
}

fn file_error(path: &Path) -> impl FnOnce(WmakeError) -> DriveError + '_ {
  move |error| {
    log::error!("FAILED, file {}", path.display());
    DriveError::File { path: path.to_path_buf(), error }
  }
}

/// Converts everything under `root` (or `root` itself when it's a file).
///
/// The direction is inferred from what's already there: no TGAs means
/// encode, no PNGs means decode, a mix asks through `prompt`. No file is
/// touched before the direction is settled. The first per-file failure
/// aborts the pass with that file's path attached.
pub fn convert_tree(
  root: &Path, config: &Config, prompt: &mut dyn Prompt,
) -> Result<ConvertStats, DriveError> {
  let files = collect_files(root)?;

  let mut work: Vec<(PathBuf, FileKind)> = Vec::with_capacity(files.len());
  let mut pngs = 0_u32;
  let mut tgas = 0_u32;
  for file in files {
    let kind = sniff_file(&file).map_err(WmakeError::Io).map_err(file_error(&file))?;
    match kind {
      FileKind::Png => pngs += 1,
      k if k.is_tga() => tgas += 1,
      _ => {}
    }
    work.push((file, kind));
  }

  let direction = if tgas == 0 {
    log::info!("direction: PNG -> TGA");
    Direction::Encode
  } else if pngs == 0 {
    log::info!("direction: TGA -> PNG");
    Direction::Decode
  } else {
    let choice = prompt
      .choose(
        "This directory contains both converted and non-converted images",
        &["PNG -> TGA", "TGA -> PNG"],
      )
      .map_err(DriveError::Prompt)?;
    if choice == 0 {
      Direction::Encode
    } else {
      Direction::Decode
    }
  };

  let mut stats = ConvertStats::default();
  for (file, kind) in work {
    match direction {
      Direction::Encode => {
        encode_file(&file, kind, config, &mut stats).map_err(file_error(&file))?;
      }
      Direction::Decode => {
        decode_file(&file, kind, config, &mut stats).map_err(file_error(&file))?;
      }
    }
  }
  Ok(stats)
}

/// The `*.png`-named files under `root`, or `root` alone when it's a file.
///
/// Converted assets keep their `.png` names, so both directions walk the
/// same set.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>, DriveError> {
  if root.is_file() {
    return Ok(vec![root.to_path_buf()]);
  }
  let mut files = Vec::new();
  for entry in WalkDir::new(root).sort_by_file_name() {
    let entry = entry.map_err(|e| {
      let path = e.path().unwrap_or(root).to_path_buf();
      DriveError::File { path, error: WmakeError::Io(e.into()) }
    })?;
    if !entry.file_type().is_file() {
      continue;
    }
    let is_png_name = entry
      .path()
      .extension()
      .and_then(|e| e.to_str())
      .map(|e| e.eq_ignore_ascii_case("png"))
      .unwrap_or(false);
    if is_png_name {
      files.push(entry.into_path());
    }
  }
  Ok(files)
}

/// Loads any classified image file into an RGBA bitmap plus its exact
/// format.
fn load_image(path: &Path, kind: FileKind, config: &Config) -> WmakeResult<(Bitmap, ImageFormat)> {
  match kind {
    FileKind::Png => Ok((png_io::read_png(path)?, ImageFormat::Png)),
    k if k.is_tga() => {
      let bytes = std::fs::read(path)?;
      tga::decode_tga(&bytes, config.encode_mode)
    }
    _ => Err(WmakeError::MalformedHeader),
  }
}

fn encode_file(
  path: &Path, kind: FileKind, config: &Config, stats: &mut ConvertStats,
) -> WmakeResult<()> {
  if kind == FileKind::Unknown {
    stats.skipped += 1;
    return Ok(());
  }
  let (bitmap, format) = load_image(path, kind, config)?;

  let mut target = target_format(path, config);
  if config.auto_rgba && target.is_palette() && bitmap.distinct_colors(256).is_none() {
    log::debug!("{}: too many colours for a palette, promoting to TGA-32", path.display());
    target = ImageFormat::Tga32;
  }
  if format == target {
    stats.skipped += 1;
    return Ok(());
  }

  // Palette overflow is the one recoverable failure: quantise (with backup)
  // and retry exactly once. The attempt has to come first, since alternate
  // mode stride padding can add a colour the source never had.
  let bytes = match tga::encode_tga(&bitmap, target, config.encode_mode) {
    Ok(bytes) => bytes,
    Err(WmakeError::PaletteOverflow) => {
      let reduced = quant::compress_colors(&bitmap, Some(path), &config.backup_dir);
      tga::encode_tga(&reduced, target, config.encode_mode)?
    }
    Err(e) => return Err(e),
  };
  std::fs::write(path, bytes)?;
  log::info!("{} {format} -> {target}", path.display());
  stats.bump(target);
  Ok(())
}

fn decode_file(
  path: &Path, kind: FileKind, config: &Config, stats: &mut ConvertStats,
) -> WmakeResult<()> {
  if !kind.is_tga() {
    stats.skipped += 1;
    return Ok(());
  }
  let (bitmap, format) = load_image(path, kind, config)?;
  png_io::write_png(path, &bitmap)?;
  log::info!("{} {format} -> PNG", path.display());
  stats.bump(ImageFormat::Png);
  Ok(())
}
