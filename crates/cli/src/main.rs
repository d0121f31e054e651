mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use antler_lib::execute::ExecutorKind;
use antler_lib::{BuildConfig, MessageLevel};

use cmd::{cmd_run, cmd_targets};
use output::{OutputFormat, print_error};

/// antler - XML-driven build engine
#[derive(Parser)]
#[command(name = "antler")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Show debug diagnostics and verbose task output
  #[arg(short, long, global = true, conflicts_with = "quiet")]
  verbose: bool,

  /// Only show warnings and errors
  #[arg(short, long, global = true)]
  quiet: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run targets of a build file
  Run {
    /// Targets to run (default: the project's default target)
    targets: Vec<String>,

    /// Build file to use
    #[arg(short, long, env = "ANTLER_FILE", default_value = antler_lib::config::DEFAULT_BUILD_FILE)]
    file: PathBuf,

    /// Set a user property that the build file cannot override
    #[arg(short = 'D', value_name = "NAME=VALUE", value_parser = parse_property)]
    define: Vec<(String, String)>,

    /// Keep running independent targets after a failure
    #[arg(short, long)]
    keep_going: bool,

    /// How targets and their dependencies are run: default, single-check or ignore-deps
    #[arg(long, env = "ANTLER_EXECUTOR", default_value = "default")]
    executor: ExecutorKind,
  },

  /// List the targets of a build file
  Targets {
    /// Build file to use
    #[arg(short, long, env = "ANTLER_FILE", default_value = antler_lib::config::DEFAULT_BUILD_FILE)]
    file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },
}

fn parse_property(value: &str) -> std::result::Result<(String, String), String> {
  match value.split_once('=') {
    Some((name, _)) if name.is_empty() => Err(format!("missing property name in '{}'", value)),
    Some((name, value)) => Ok((name.to_string(), value.to_string())),
    None => Ok((value.to_string(), String::new())),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_filter = if cli.verbose {
    "debug"
  } else if cli.quiet {
    "warn"
  } else {
    "info"
  };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let level = if cli.verbose {
    MessageLevel::Verbose
  } else if cli.quiet {
    MessageLevel::Warning
  } else {
    MessageLevel::Info
  };

  let result: Result<ExitCode> = match cli.command {
    Commands::Run {
      targets,
      file,
      define,
      keep_going,
      executor,
    } => {
      let config = BuildConfig {
        build_file: file,
        targets,
        executor,
        keep_going,
        properties: define,
      };
      cmd_run(&config, level)
    }
    Commands::Targets { file, format } => cmd_targets(&file, format).map(|()| ExitCode::SUCCESS),
  };

  match result {
    Ok(code) => code,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_property() {
    assert_eq!(parse_property("a=1").unwrap(), ("a".to_string(), "1".to_string()));
    assert_eq!(parse_property("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
    assert_eq!(parse_property("flag").unwrap(), ("flag".to_string(), String::new()));
    assert!(parse_property("=x").is_err());
  }

  #[test]
  fn test_executor_names() {
    let cli = Cli::try_parse_from(["antler", "run", "--executor", "single-check"]).unwrap();
    let Commands::Run { executor, .. } = cli.command else {
      panic!("expected run command");
    };
    assert_eq!(executor, ExecutorKind::SingleCheck);

    let cli = Cli::try_parse_from(["antler", "run"]).unwrap();
    let Commands::Run { executor, .. } = cli.command else {
      panic!("expected run command");
    };
    assert_eq!(executor, ExecutorKind::Default);

    assert!(Cli::try_parse_from(["antler", "run", "--executor", "parallel"]).is_err());
  }

  #[test]
  fn test_cli_definition() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
  }
}
