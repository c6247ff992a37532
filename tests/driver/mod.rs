use std::path::{Path, PathBuf};

use wmake::bitmap::Bitmap;
use wmake::config::Config;
use wmake::convert::{convert_tree, Prompt};
use wmake::pixels::RGBA8;
use wmake::png_io::{read_png, write_png};
use wmake::sniff::{sniff_file, FileKind};
use wmake::target::target_format;
use wmake::tga::{decode_tga, encode_tga};
use wmake::{EncodeMode, ImageFormat, WmakeError};

/// A fresh directory under the system temp dir.
fn temp_dir(tag: &str) -> PathBuf {
  let mut name = format!("wmake-{tag}-");
  for b in super::rand_bytes(8) {
    name.push_str(&format!("{b:02x}"));
  }
  let dir = std::env::temp_dir().join(name);
  std::fs::create_dir_all(&dir).unwrap();
  dir
}

fn test_config(dir: &Path) -> Config {
  Config { backup_dir: dir.join("backups"), ..Config::default() }
}

fn small_bitmap() -> Bitmap {
  Bitmap {
    width: 2,
    height: 2,
    pixels: vec![
      RGBA8::new(255, 0, 0, 255),
      RGBA8::new(0, 255, 0, 255),
      RGBA8::new(0, 255, 0, 255),
      RGBA8::new(0, 0, 0, 0),
    ],
  }
}

/// 300 distinct opaque colours; more than any palette can hold.
fn many_colour_bitmap() -> Bitmap {
  let mut pixels = Vec::with_capacity(300);
  for i in 0..300_u32 {
    pixels.push(RGBA8::new((i % 256) as u8, (i / 256) as u8, 0, 255));
  }
  Bitmap { width: 30, height: 10, pixels }
}

/// Answers the mixed-directory question with a fixed choice.
struct Scripted {
  answer: usize,
  asked: u32,
}

impl Scripted {
  fn new(answer: usize) -> Self {
    Scripted { answer, asked: 0 }
  }
}

impl Prompt for Scripted {
  fn choose(&mut self, question: &str, options: &[&str]) -> std::io::Result<usize> {
    assert!(question.contains("both"), "unexpected question: {question}");
    assert_eq!(options, ["PNG -> TGA", "TGA -> PNG"]);
    self.asked += 1;
    Ok(self.answer)
  }
}

/// For directories that must never ask: answering is an error.
struct NoPrompt;

impl Prompt for NoPrompt {
  fn choose(&mut self, _: &str, _: &[&str]) -> std::io::Result<usize> {
    Err(std::io::Error::new(std::io::ErrorKind::Other, "unexpected prompt"))
  }
}

#[test]
fn pure_png_directory_encodes_without_asking() {
  let dir = temp_dir("encode");
  write_png(&dir.join("a.png"), &small_bitmap()).unwrap();
  std::fs::create_dir_all(dir.join("sub")).unwrap();
  write_png(&dir.join("sub/b.png"), &small_bitmap()).unwrap();

  let stats = convert_tree(&dir, &test_config(&dir), &mut NoPrompt).unwrap();
  assert_eq!(stats.saved(ImageFormat::TgaRlp), 2);
  assert_eq!(stats.total_saved(), 2);
  assert_eq!(sniff_file(&dir.join("a.png")).unwrap(), FileKind::TgaRlePalette);
  assert_eq!(sniff_file(&dir.join("sub/b.png")).unwrap(), FileKind::TgaRlePalette);

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn pure_tga_directory_decodes_without_asking() {
  let dir = temp_dir("decode");
  let bitmap = small_bitmap();
  let bytes = encode_tga(&bitmap, ImageFormat::TgaRlp, EncodeMode::Default).unwrap();
  std::fs::write(dir.join("a.png"), &bytes).unwrap();
  std::fs::write(dir.join("b.png"), &bytes).unwrap();

  let stats = convert_tree(&dir, &test_config(&dir), &mut NoPrompt).unwrap();
  assert_eq!(stats.saved(ImageFormat::Png), 2);
  assert_eq!(sniff_file(&dir.join("a.png")).unwrap(), FileKind::Png);
  assert_eq!(read_png(&dir.join("a.png")).unwrap(), bitmap);

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn mixed_directory_asks_and_applies_the_choice() {
  let dir = temp_dir("mixed");
  write_png(&dir.join("source.png"), &small_bitmap()).unwrap();
  let tga = encode_tga(&small_bitmap(), ImageFormat::TgaRlp, EncodeMode::Default).unwrap();
  std::fs::write(dir.join("asset.png"), &tga).unwrap();

  let mut prompt = Scripted::new(1); // TGA -> PNG
  let stats = convert_tree(&dir, &test_config(&dir), &mut prompt).unwrap();
  assert_eq!(prompt.asked, 1);
  assert_eq!(stats.saved(ImageFormat::Png), 1);
  assert_eq!(stats.skipped, 1); // the PNG source has nothing to decode
  assert_eq!(sniff_file(&dir.join("asset.png")).unwrap(), FileKind::Png);
  assert_eq!(sniff_file(&dir.join("source.png")).unwrap(), FileKind::Png);

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn mixed_directory_with_no_answer_touches_nothing() {
  let dir = temp_dir("mixed-noanswer");
  write_png(&dir.join("source.png"), &small_bitmap()).unwrap();
  let tga = encode_tga(&small_bitmap(), ImageFormat::TgaRlp, EncodeMode::Default).unwrap();
  std::fs::write(dir.join("asset.png"), &tga).unwrap();
  let before_src = std::fs::read(dir.join("source.png")).unwrap();
  let before_tga = std::fs::read(dir.join("asset.png")).unwrap();

  let result = convert_tree(&dir, &test_config(&dir), &mut NoPrompt);
  assert!(result.is_err());
  assert_eq!(std::fs::read(dir.join("source.png")).unwrap(), before_src);
  assert_eq!(std::fs::read(dir.join("asset.png")).unwrap(), before_tga);

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn filename_conventions_pick_the_variant() {
  let dir = temp_dir("suffix");
  let bitmap = small_bitmap();
  for name in ["a.rgb.png", "b.rgba.png", "c.p.png", "d.rlp.png", "plain.png"] {
    write_png(&dir.join(name), &bitmap).unwrap();
  }
  std::fs::create_dir_all(dir.join("icons.rgb")).unwrap();
  write_png(&dir.join("icons.rgb/e.png"), &bitmap).unwrap();

  let stats = convert_tree(&dir, &test_config(&dir), &mut NoPrompt).unwrap();
  assert_eq!(stats.total_saved(), 6);
  assert_eq!(stats.saved(ImageFormat::Tga16), 2);

  let depth_of = |name: &str| std::fs::read(dir.join(name)).unwrap()[16];
  assert_eq!(sniff_file(&dir.join("a.rgb.png")).unwrap(), FileKind::TgaTruecolor);
  assert_eq!(depth_of("a.rgb.png"), 16);
  assert_eq!(sniff_file(&dir.join("b.rgba.png")).unwrap(), FileKind::TgaTruecolor);
  assert_eq!(depth_of("b.rgba.png"), 32);
  assert_eq!(sniff_file(&dir.join("c.p.png")).unwrap(), FileKind::TgaPalette);
  assert_eq!(sniff_file(&dir.join("d.rlp.png")).unwrap(), FileKind::TgaRlePalette);
  assert_eq!(sniff_file(&dir.join("plain.png")).unwrap(), FileKind::TgaRlePalette);
  assert_eq!(sniff_file(&dir.join("icons.rgb/e.png")).unwrap(), FileKind::TgaTruecolor);
  assert_eq!(depth_of("icons.rgb/e.png"), 16);

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn palette_overflow_quantises_with_backup() {
  let dir = temp_dir("quantise");
  let mut config = test_config(&dir);
  config.default_format = ImageFormat::TgaP;
  write_png(&dir.join("img.png"), &many_colour_bitmap()).unwrap();

  let stats = convert_tree(&dir, &config, &mut NoPrompt).unwrap();
  assert_eq!(stats.saved(ImageFormat::TgaP), 1);
  assert_eq!(sniff_file(&dir.join("img.png")).unwrap(), FileKind::TgaPalette);

  // the emitted palette file holds at most 256 colours and stays opaque
  let bytes = std::fs::read(dir.join("img.png")).unwrap();
  let (decoded, _) = decode_tga(&bytes, EncodeMode::Default).unwrap();
  assert!(decoded.distinct_colors(256).is_some());
  assert!(decoded.is_fully_opaque());

  // exactly one timestamped backup of the original
  let backups: Vec<_> =
    std::fs::read_dir(config.backup_dir).unwrap().map(|e| e.unwrap()).collect();
  assert_eq!(backups.len(), 1);
  let backup_name = backups[0].file_name().into_string().unwrap();
  assert!(backup_name.ends_with("__img.png"), "{backup_name}");
  assert_eq!(read_png(&backups[0].path()).unwrap(), many_colour_bitmap());

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn alternate_padding_overflow_goes_through_the_quantiser_retry() {
  let dir = temp_dir("pad-overflow");
  let mut config = test_config(&dir);
  config.default_format = ImageFormat::TgaP;
  config.encode_mode = EncodeMode::Alternate;

  // exactly 256 distinct colours, none of them opaque black, and a width
  // the 16-pixel stride doesn't divide: the padding colour is the 257th,
  // so only the encode attempt itself can notice the overflow
  let mut pixels = Vec::with_capacity(260);
  for i in 0..260_u32 {
    pixels.push(RGBA8::new((i % 256) as u8, 1, 7, 255));
  }
  let bitmap = Bitmap { width: 5, height: 52, pixels };
  assert_eq!(bitmap.distinct_colors(256), Some(256));
  write_png(&dir.join("img.png"), &bitmap).unwrap();

  let result = convert_tree(&dir, &config, &mut NoPrompt);

  // whatever the retry produced, the quantiser must have run, leaving the
  // pre-quantisation backup behind
  let backups: Vec<_> =
    std::fs::read_dir(&config.backup_dir).unwrap().map(|e| e.unwrap()).collect();
  assert_eq!(backups.len(), 1);
  assert!(backups[0].file_name().into_string().unwrap().ends_with("__img.png"));
  assert_eq!(read_png(&backups[0].path()).unwrap(), bitmap);

  match result {
    Ok(stats) => {
      assert_eq!(stats.saved(ImageFormat::TgaP), 1);
      assert_eq!(sniff_file(&dir.join("img.png")).unwrap(), FileKind::TgaPalette);
      let bytes = std::fs::read(dir.join("img.png")).unwrap();
      let (decoded, _) = decode_tga(&bytes, EncodeMode::Alternate).unwrap();
      assert_eq!(decoded.width, 5);
      assert!(decoded.distinct_colors(256).is_some());
    }
    // the quantised image can still land on 256 colours, and the padding
    // colour then overflows the retry too; the single-retry rule stops here
    Err(wmake::convert::DriveError::File { path, error: WmakeError::PaletteOverflow }) => {
      assert_eq!(path, dir.join("img.png"));
    }
    other => panic!("unexpected outcome: {other:?}"),
  }

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn auto_rgba_promotes_instead_of_quantising() {
  let dir = temp_dir("auto-rgba");
  let mut config = test_config(&dir);
  config.default_format = ImageFormat::TgaP;
  config.auto_rgba = true;
  write_png(&dir.join("img.png"), &many_colour_bitmap()).unwrap();

  let stats = convert_tree(&dir, &config, &mut NoPrompt).unwrap();
  assert_eq!(stats.saved(ImageFormat::Tga32), 1);
  let bytes = std::fs::read(dir.join("img.png")).unwrap();
  assert_eq!(bytes[16], 32);
  let (decoded, _) = decode_tga(&bytes, EncodeMode::Default).unwrap();
  assert_eq!(decoded, many_colour_bitmap());
  assert!(!config.backup_dir.exists());

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn already_converted_files_skip_only_on_exact_match() {
  let dir = temp_dir("skip");
  let bitmap = small_bitmap();
  // one asset already in the default target, one in the other palette form
  let rlp = encode_tga(&bitmap, ImageFormat::TgaRlp, EncodeMode::Default).unwrap();
  std::fs::write(dir.join("done.png"), &rlp).unwrap();
  let p = encode_tga(&bitmap, ImageFormat::TgaP, EncodeMode::Default).unwrap();
  std::fs::write(dir.join("cross.png"), &p).unwrap();
  write_png(&dir.join("fresh.png"), &bitmap).unwrap();

  let mut prompt = Scripted::new(0); // PNG -> TGA
  let stats = convert_tree(&dir, &test_config(&dir), &mut prompt).unwrap();
  assert_eq!(prompt.asked, 1);
  // the exact match is left alone; the cross-palette file is re-encoded
  assert_eq!(stats.skipped, 1);
  assert_eq!(stats.saved(ImageFormat::TgaRlp), 2);
  assert_eq!(std::fs::read(dir.join("done.png")).unwrap(), rlp);
  assert_eq!(sniff_file(&dir.join("cross.png")).unwrap(), FileKind::TgaRlePalette);

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn single_file_conversion_works() {
  let dir = temp_dir("single");
  let file = dir.join("only.rgb.png");
  write_png(&file, &small_bitmap()).unwrap();

  let stats = convert_tree(&file, &test_config(&dir), &mut NoPrompt).unwrap();
  assert_eq!(stats.saved(ImageFormat::Tga16), 1);
  assert_eq!(sniff_file(&file).unwrap(), FileKind::TgaTruecolor);

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn non_image_png_named_files_are_skipped() {
  let dir = temp_dir("nonimage");
  std::fs::write(dir.join("junk.png"), b"not an image at all").unwrap();
  write_png(&dir.join("real.png"), &small_bitmap()).unwrap();

  let stats = convert_tree(&dir, &test_config(&dir), &mut NoPrompt).unwrap();
  assert_eq!(stats.skipped, 1);
  assert_eq!(stats.saved(ImageFormat::TgaRlp), 1);
  assert_eq!(std::fs::read(dir.join("junk.png")).unwrap(), b"not an image at all");

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn a_broken_file_aborts_the_pass_with_its_path() {
  let dir = temp_dir("broken");
  // claims to be a palette TGA, but the payload is missing
  let mut bytes = vec![0_u8; 18];
  bytes[0] = 46;
  bytes[1] = 1;
  bytes[2] = 1;
  bytes[5] = 1;
  bytes[7] = 32;
  bytes[12] = 4;
  bytes[14] = 4;
  std::fs::write(dir.join("broken.png"), &bytes).unwrap();

  let err = convert_tree(&dir, &test_config(&dir), &mut NoPrompt).unwrap_err();
  match err {
    wmake::convert::DriveError::File { path, .. } => {
      assert_eq!(path, dir.join("broken.png"));
    }
    other => panic!("unexpected error: {other:?}"),
  }

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn config_overlay_merges_known_keys() {
  let dir = temp_dir("overlay");
  std::fs::write(
    dir.join("wmake.json"),
    r#"{ "default_format": "TGA-16", "encode_mode": "alternate", "unrelated": 1 }"#,
  )
  .unwrap();
  let mut config = test_config(&dir);
  config.load_overlay(&dir).unwrap();
  assert_eq!(config.default_format, ImageFormat::Tga16);
  assert_eq!(config.encode_mode, EncodeMode::Alternate);
  assert!(!config.auto_rgba);

  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn target_selection_table() {
  let dir = temp_dir("targets");
  let config = test_config(&dir);
  let cases = [
    ("face.rgb.png", ImageFormat::Tga16),
    ("face.rgba.png", ImageFormat::Tga32),
    ("face.p.png", ImageFormat::TgaP),
    ("face.rlp.png", ImageFormat::TgaRlp),
    ("assets.rgba/face.png", ImageFormat::Tga32),
    ("deep/assets.rlp/face.png", ImageFormat::TgaRlp),
    ("face.png", ImageFormat::TgaRlp),
    // a directory tag applies to files below it, not to itself
    ("assets.rgb", ImageFormat::TgaRlp),
  ];
  for (path, expected) in cases {
    assert_eq!(target_format(Path::new(path), &config), expected, "{path}");
  }

  std::fs::remove_dir_all(&dir).unwrap();
}
