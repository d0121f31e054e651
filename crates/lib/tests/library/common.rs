//! Shared helpers for the library tests.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use antler_lib::listener::RecordingListener;
use antler_lib::{Project, Result, parse};

/// Parse `source`, run its top-level elements and record every event.
pub fn load(source: &str) -> (Project, RecordingListener) {
  try_load(source).unwrap()
}

pub fn try_load(source: &str) -> Result<(Project, RecordingListener)> {
  let listener = RecordingListener::new();
  let mut project = Project::new();
  project.add_listener(Rc::new(listener.clone()));
  parse::load_str(&mut project, source)?;
  Ok((project, listener))
}

/// Load `source` and run `targets` with the project's executor.
pub fn run(source: &str, targets: &[&str]) -> (Result<()>, RecordingListener) {
  let (mut project, listener) = load(source);
  let result = project.execute_targets(&names(targets));
  (result, listener)
}

pub fn names(targets: &[&str]) -> Vec<String> {
  targets.iter().map(|t| t.to_string()).collect()
}

/// Write `content` to `name` inside `dir` and return the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
  let path = dir.join(name);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();
  path
}
