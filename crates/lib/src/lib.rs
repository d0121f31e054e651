//! antler-lib: an XML-driven build engine.
//!
//! A build file is parsed into a tree of unbound elements grouped into
//! targets. Elements are bound to components (tasks, data types and macro
//! instances) only right before they run, so attribute values see the
//! properties set by everything that ran earlier.
//!
//! - [`parse`]: build file to element tree
//! - [`project`]: the per-build context
//! - [`component`]: binding descriptors and the type registry
//! - [`execute`]: the target graph and executors
//! - [`macros`]: `macrodef` templates

pub mod component;
pub mod config;
pub mod element;
pub mod error;
pub mod execute;
pub mod listener;
pub mod location;
pub mod macros;
pub mod parse;
pub mod project;
pub mod property;
pub mod target;
pub mod tasks;

use std::rc::Rc;

pub use config::BuildConfig;
pub use error::{BuildError, ErrorKind, Result};
pub use listener::{BuildListener, MessageLevel};
pub use project::Project;

/// Load the configured build file and run the requested targets.
///
/// Listeners see `build_started` before the file is parsed and
/// `build_finished` with the outcome, whether it failed or not.
pub fn run_build(config: &BuildConfig, listeners: Vec<Rc<dyn BuildListener>>) -> Result<Project> {
  let mut project = config.project();
  for listener in listeners {
    project.add_listener(listener);
  }

  project.fire(|l| l.build_started());
  let result =
    parse::load_file(&mut project, &config.build_file).and_then(|()| project.execute_targets(&config.targets));
  project.fire(|l| l.build_finished(result.as_ref().err()));

  result.map(|()| project)
}

/// Load the configured build file without running any target.
pub fn load_project(config: &BuildConfig) -> Result<Project> {
  let mut project = config.project();
  parse::load_file(&mut project, &config.build_file)?;
  Ok(project)
}
