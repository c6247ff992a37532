//! Project options and per-user paths.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{EncodeMode, ImageFormat};

/// The options the conversion driver consumes.
#[derive(Debug, Clone)]
pub struct Config {
  /// Target variant for files whose name gives no hint.
  pub default_format: ImageFormat,
  /// When true, sources with more than 256 distinct colours encode as
  /// TGA-32 instead of being quantised down to a palette.
  pub auto_rgba: bool,
  /// Channel-order and stride convention of the target device family.
  pub encode_mode: EncodeMode,
  /// Where lossy-compression backups land. Derived once from the per-user
  /// config root; tests point it somewhere disposable.
  pub backup_dir: PathBuf,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      default_format: ImageFormat::TgaRlp,
      auto_rgba: false,
      encode_mode: EncodeMode::Default,
      backup_dir: default_backup_dir(),
    }
  }
}

/// The subset of options a project may override from `wmake.json`.
#[derive(Debug, Default, Deserialize)]
struct Overlay {
  default_format: Option<ImageFormat>,
  auto_rgba: Option<bool>,
  encode_mode: Option<EncodeMode>,
}

impl Config {
  /// Applies a project-local `wmake.json` overlay when one exists in the
  /// given directory. Keys the file doesn't set keep their current values;
  /// unknown keys are ignored.
  pub fn load_overlay(&mut self, project_dir: &Path) -> std::io::Result<()> {
    let path = project_dir.join("wmake.json");
    if !path.is_file() {
      return Ok(());
    }
    log::info!("using config overlay {}", path.display());
    let text = std::fs::read_to_string(&path)?;
    let overlay: Overlay = serde_json::from_str(&text)
      .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    if let Some(v) = overlay.default_format {
      self.default_format = v;
    }
    if let Some(v) = overlay.auto_rgba {
      self.auto_rgba = v;
    }
    if let Some(v) = overlay.encode_mode {
      self.encode_mode = v;
    }
    Ok(())
  }
}

/// The per-user configuration root for this platform.
#[must_use]
pub fn config_root() -> Option<PathBuf> {
  if cfg!(windows) {
    std::env::var_os("APPDATA").map(PathBuf::from)
  } else if cfg!(target_os = "macos") {
    home_dir().map(|h| h.join("Library/Application Support"))
  } else {
    home_dir().map(|h| h.join(".config"))
  }
}

fn home_dir() -> Option<PathBuf> {
  std::env::var_os("HOME").map(PathBuf::from)
}

/// The default backup directory: config root + `backup`, with the system
/// temp dir as a last resort for sessions without a resolvable home.
#[must_use]
pub fn default_backup_dir() -> PathBuf {
  match config_root() {
    Some(root) => root.join("backup"),
    None => std::env::temp_dir().join("wmake-backup"),
  }
}
