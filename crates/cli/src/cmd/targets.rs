//! Implementation of the `antler targets` command.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use antler_lib::target::TargetInfo;
use antler_lib::{BuildConfig, load_project};

use crate::output::{OutputFormat, print_json};

/// List the targets of a build file.
///
/// Targets with a description are listed as main targets, the rest as other
/// targets. Top-level elements run while loading, so `<description>` and
/// top-level properties are in effect.
pub fn cmd_targets(file: &Path, format: OutputFormat) -> Result<()> {
  let config = BuildConfig {
    build_file: file.to_path_buf(),
    ..Default::default()
  };
  let project = load_project(&config).with_context(|| format!("Failed to load build file: {}", file.display()))?;
  let targets = project.target_summaries();

  if format.is_json() {
    let json_output = serde_json::json!({
      "project": project.name(),
      "description": project.description().map(str::trim),
      "default": project.default_target(),
      "targets": targets,
    });
    return print_json(&json_output);
  }

  if let Some(description) = project.description() {
    println!("{}", description.trim());
    println!();
  }

  let (main, other): (Vec<&TargetInfo>, Vec<&TargetInfo>) = targets.iter().partition(|t| t.description.is_some());
  let width = targets.iter().map(|t| t.name.len()).max().unwrap_or(0);

  print_section("Main targets:", &main, width);
  if !other.is_empty() {
    println!();
    print_section("Other targets:", &other, width);
  }

  if let Some(default) = project.default_target() {
    println!();
    println!("Default target: {}", default);
  }

  Ok(())
}

fn print_section(title: &str, targets: &[&TargetInfo], width: usize) {
  println!("{}", title.if_supports_color(Stream::Stdout, |s| s.bold()));
  for target in targets {
    match &target.description {
      Some(description) => println!(
        " {:<width$}  {}",
        target.name,
        description.if_supports_color(Stream::Stdout, |s| s.dimmed())
      ),
      None => println!(" {}", target.name),
    }
  }
}
