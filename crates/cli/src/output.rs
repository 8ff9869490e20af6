//! Terminal rendering for command results.
//!
//! Text mode prints a status headline followed by indented fields. With
//! `-o json` a command prints one JSON document on stdout and nothing else.

use std::fmt::Display;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use wheelhouse_lib::wheel::InventoryEntry;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Outcome shown in front of a headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Done,
  Skipped,
  Warning,
  Failed,
}

impl Status {
  fn marker(self) -> &'static str {
    match self {
      Status::Done => "✓",
      Status::Skipped => "•",
      Status::Warning => "⚠",
      Status::Failed => "✗",
    }
  }
}

/// Print a headline. Warnings and failures go to stderr.
pub fn headline(status: Status, message: impl Display) {
  let marker = status.marker();
  match status {
    Status::Done => println!("{} {}", marker.if_supports_color(Stream::Stdout, |s| s.green()), message),
    Status::Skipped => println!("{} {}", marker.if_supports_color(Stream::Stdout, |s| s.blue()), message),
    Status::Warning => {
      let message = message.to_string();
      eprintln!(
        "{} {}",
        marker.if_supports_color(Stream::Stderr, |s| s.yellow()),
        message.if_supports_color(Stream::Stderr, |s| s.yellow())
      );
    }
    Status::Failed => {
      let message = message.to_string();
      eprintln!(
        "{} {}",
        marker.if_supports_color(Stream::Stderr, |s| s.red()),
        message.if_supports_color(Stream::Stderr, |s| s.red())
      );
    }
  }
}

pub fn field(label: &str, value: impl Display) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// `  → default  12 requirements`
pub fn bucket_line(id: &str, requirements: usize) {
  println!(
    "  → {}  {}",
    id.if_supports_color(Stream::Stdout, |s| s.bold()),
    count(requirements, "requirement")
  );
}

/// `  foo==1.2  1.4 MiB (3.9 MiB unpacked)`
pub fn wheel_line(name: &str, entry: &InventoryEntry) {
  let pin = format!("{}=={}", name, entry.version);
  println!(
    "  {}  {} ({} unpacked)",
    pin.if_supports_color(Stream::Stdout, |s| s.bold()),
    wheel_size(entry.compressed),
    wheel_size(entry.uncompressed)
  );
}

pub fn count(n: usize, noun: &str) -> String {
  if n == 1 { format!("1 {}", noun) } else { format!("{} {}s", n, noun) }
}

/// Size with binary prefixes.
pub fn wheel_size(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];

  if bytes < 1024 {
    return format!("{} B", bytes);
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit < UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }
  format!("{:.1} {}", value, UNITS[unit])
}

/// `sha256:` plus the first twelve hex digits of a wheel directory digest.
pub fn short_digest(digest: &str) -> String {
  format!("sha256:{}", digest.get(..12).unwrap_or(digest))
}

pub fn elapsed(duration: Duration) -> String {
  let secs = duration.as_secs();
  if secs >= 60 {
    format!("{}m{:02}s", secs / 60, secs % 60)
  } else {
    format!("{:.1}s", duration.as_secs_f64())
  }
}

pub fn emit_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
  println!("{}", json);
  Ok(())
}
