//! Implementation of the `antler run` command.
//!
//! Loads the build file, runs the requested targets and prints a build
//! summary in the familiar `BUILD SUCCESSFUL` / `BUILD FAILED` form.

use std::process::ExitCode;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use antler_lib::{BuildConfig, MessageLevel, run_build};

use crate::output::{ConsoleListener, format_duration, print_error, print_success};

/// Execute the run command.
///
/// Returns the process exit code: success, the status requested by a
/// failing `fail` task, or 1 for any other build failure.
pub fn cmd_run(config: &BuildConfig, level: MessageLevel) -> Result<ExitCode> {
  config
    .build_file
    .metadata()
    .with_context(|| format!("Build file not found: {}", config.build_file.display()))?;

  println!("Buildfile: {}", config.build_file.display());
  debug!(executor = %config.executor, keep_going = config.keep_going, "starting build");

  let start = Instant::now();
  let result = run_build(config, vec![Rc::new(ConsoleListener::new(level))]);
  let elapsed = start.elapsed();

  let code = match result {
    Ok(_) => {
      println!();
      print_success("BUILD SUCCESSFUL");
      ExitCode::SUCCESS
    }
    Err(err) => {
      eprintln!();
      print_error("BUILD FAILED");
      eprintln!("{}", err);
      let status = err.exit_status().and_then(|s| u8::try_from(s).ok()).filter(|&s| s != 0);
      ExitCode::from(status.unwrap_or(1))
    }
  };

  println!("Total time: {}", format_duration(elapsed));
  Ok(code)
}
