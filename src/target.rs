//! Per-file output selection from filename conventions.

use std::path::{Component, Path};

use crate::config::Config;
use crate::ImageFormat;

/// The naming conventions that pin a target variant: as the tail of a file
/// stem (`clock.rgb.png`) or as a directory name tail (`icons.rgb/`).
const SUFFIX_TABLE: [(&str, ImageFormat); 4] = [
  ("rgb", ImageFormat::Tga16),
  ("rgba", ImageFormat::Tga32),
  ("p", ImageFormat::TgaP),
  ("rlp", ImageFormat::TgaRlp),
];

/// Picks the TGA variant a source file should encode to.
///
/// First matching convention in table order wins; a path matching none of
/// them gets the project's `default_format`.
#[must_use]
pub fn target_format(path: &Path, config: &Config) -> ImageFormat {
  for (tag, format) in SUFFIX_TABLE {
    if name_matches(path, tag) || dir_matches(path, tag) {
      return format;
    }
  }
  config.default_format
}

fn name_matches(path: &Path, tag: &str) -> bool {
  let tail = format!(".{tag}.png");
  match path.file_name().and_then(|n| n.to_str()) {
    Some(name) => name.ends_with(&tail),
    None => false,
  }
}

fn dir_matches(path: &Path, tag: &str) -> bool {
  let tail = format!(".{tag}");
  let mut components: Vec<Component<'_>> = path.components().collect();
  // the final component is the file itself
  components.pop();
  components.into_iter().any(|c| match c {
    Component::Normal(os) => match os.to_str() {
      Some(s) => s.ends_with(&tail),
      None => false,
    },
    _ => false,
  })
}
