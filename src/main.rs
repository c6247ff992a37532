use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use wmake::config::Config;
use wmake::convert::{convert_tree, Prompt};
use wmake::{EncodeMode, ImageFormat};

/// Convert wearable mini-app image assets between PNG and the device TGA
/// dialect, in place.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Directory (or single image) to convert.
  path: PathBuf,

  /// Target variant for files whose name gives no hint
  /// (TGA-16, TGA-32, TGA-P or TGA-RLP).
  #[arg(long, value_parser = parse_format)]
  default_format: Option<ImageFormat>,

  /// Channel-order convention: "default" or "alternate" (swapped red/blue,
  /// 16-pixel palette row strides).
  #[arg(long, value_parser = parse_mode)]
  encode_mode: Option<EncodeMode>,

  /// Encode many-colour sources as TGA-32 instead of quantising them down
  /// to a palette.
  #[arg(long)]
  auto_rgba: bool,
}

fn parse_format(s: &str) -> Result<ImageFormat, String> {
  match s {
    "TGA-16" => Ok(ImageFormat::Tga16),
    "TGA-32" => Ok(ImageFormat::Tga32),
    "TGA-P" => Ok(ImageFormat::TgaP),
    "TGA-RLP" => Ok(ImageFormat::TgaRlp),
    _ => Err(format!("unknown format `{s}` (expected TGA-16, TGA-32, TGA-P or TGA-RLP)")),
  }
}

fn parse_mode(s: &str) -> Result<EncodeMode, String> {
  match s {
    "default" => Ok(EncodeMode::Default),
    "alternate" => Ok(EncodeMode::Alternate),
    _ => Err(format!("unknown encode mode `{s}` (expected default or alternate)")),
  }
}

/// Asks the direction question on the console, retrying until the answer is
/// one of the offered numbers.
struct ConsolePrompt;

impl Prompt for ConsolePrompt {
  fn choose(&mut self, question: &str, options: &[&str]) -> std::io::Result<usize> {
    println!("{question}");
    for (i, option) in options.iter().enumerate() {
      println!("{} - {option}", i + 1);
    }
    let stdin = std::io::stdin();
    loop {
      print!("Enter your choice [1-{}]: ", options.len());
      std::io::stdout().flush()?;
      let mut line = String::new();
      if stdin.lock().read_line(&mut line)? == 0 {
        return Err(std::io::Error::new(
          std::io::ErrorKind::UnexpectedEof,
          "no answer on stdin",
        ));
      }
      if let Ok(n) = line.trim().parse::<usize>() {
        if (1..=options.len()).contains(&n) {
          return Ok(n - 1);
        }
      }
    }
  }
}

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
    .format_timestamp(None)
    .init();

  let args = Args::parse();
  let mut config = Config::default();

  let overlay_dir =
    if args.path.is_dir() { args.path.clone() } else { args.path.parent().map(PathBuf::from).unwrap_or_default() };
  if let Err(e) = config.load_overlay(&overlay_dir) {
    log::warn!("ignoring unreadable config overlay: {e}");
  }
  if let Some(format) = args.default_format {
    config.default_format = format;
  }
  if let Some(mode) = args.encode_mode {
    config.encode_mode = mode;
  }
  if args.auto_rgba {
    config.auto_rgba = true;
  }

  match convert_tree(&args.path, &config, &mut ConsolePrompt) {
    Ok(stats) => println!("{stats}"),
    Err(e) => {
      log::error!("{e}");
      std::process::exit(1);
    }
  }
}
