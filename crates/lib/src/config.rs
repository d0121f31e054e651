//! Build invocation settings.

use std::path::PathBuf;

use crate::execute::ExecutorKind;
use crate::project::Project;

/// Default build file name, looked up in the working directory.
pub const DEFAULT_BUILD_FILE: &str = "build.xml";

/// Everything needed to run one build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
  /// Build file to load.
  pub build_file: PathBuf,

  /// Targets to run; empty means the project's default target.
  pub targets: Vec<String>,

  /// How requested targets and their dependencies are run.
  pub executor: ExecutorKind,

  /// Keep running independent targets after a failure.
  pub keep_going: bool,

  /// User properties, e.g. from `-Dname=value`. They cannot be overridden by the build file.
  pub properties: Vec<(String, String)>,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      build_file: PathBuf::from(DEFAULT_BUILD_FILE),
      targets: Vec::new(),
      executor: ExecutorKind::default(),
      keep_going: false,
      properties: Vec::new(),
    }
  }
}

impl BuildConfig {
  /// A fresh project with this configuration's executor, mode and user properties applied.
  pub fn project(&self) -> Project {
    let mut project = Project::new();
    project.set_executor(self.executor.create());
    project.set_keep_going(self.keep_going);
    for (name, value) in &self.properties {
      project.properties_mut().set_user(name, value.clone());
    }
    project
  }
}
