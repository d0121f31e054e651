//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output including colored status
//! messages, duration formatting, and the console build listener.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use antler_lib::{BuildError, BuildListener, MessageLevel};

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

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
}

/// Width of the right-aligned `[task]` column.
const TASK_COLUMN: usize = 12;

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Prefix each line of a task message with the right-aligned task tag.
pub fn format_task_lines(task: Option<&str>, message: &str) -> Vec<String> {
  let prefix = match task {
    Some(task) => format!("{:>width$} ", format!("[{}]", task), width = TASK_COLUMN),
    None => String::new(),
  };
  if message.is_empty() {
    return vec![prefix.trim_end().to_string()];
  }
  message.lines().map(|line| format!("{}{}", prefix, line)).collect()
}

/// Prints target banners and task messages up to a message level.
#[derive(Debug)]
pub struct ConsoleListener {
  level: MessageLevel,
}

impl ConsoleListener {
  pub fn new(level: MessageLevel) -> Self {
    Self { level }
  }
}

impl BuildListener for ConsoleListener {
  fn target_started(&self, target: &str) {
    if self.level >= MessageLevel::Info {
      println!();
      println!("{}:", target.if_supports_color(Stream::Stdout, |s| s.bold()));
    }
  }

  fn target_finished(&self, target: &str, error: Option<&BuildError>) {
    if error.is_some() && self.level >= MessageLevel::Verbose {
      print_warning(&format!("target '{}' failed", target));
    }
  }

  fn message_logged(&self, task: Option<&str>, level: MessageLevel, message: &str) {
    if level > self.level {
      return;
    }
    for line in format_task_lines(task, message) {
      match level {
        MessageLevel::Error => eprintln!("{}", line.if_supports_color(Stream::Stderr, |s| s.red())),
        MessageLevel::Warning => eprintln!("{}", line.if_supports_color(Stream::Stderr, |s| s.yellow())),
        _ => println!("{}", line),
      }
    }
  }
}
