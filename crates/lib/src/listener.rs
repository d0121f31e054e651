//! Build event listeners.
//!
//! Listeners receive the user-visible side of a build: which targets and
//! tasks start and finish, and the messages tasks log. The CLI prints them;
//! tests record them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::Serialize;

use crate::error::BuildError;
use crate::location::Location;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
  Error,
  Warning,
  #[default]
  Info,
  Verbose,
  Debug,
}

impl MessageLevel {
  pub const NAMES: &'static [&'static str] = &["error", "warning", "info", "verbose", "debug"];

  pub fn as_str(self) -> &'static str {
    match self {
      MessageLevel::Error => "error",
      MessageLevel::Warning => "warning",
      MessageLevel::Info => "info",
      MessageLevel::Verbose => "verbose",
      MessageLevel::Debug => "debug",
    }
  }
}

impl fmt::Display for MessageLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for MessageLevel {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "error" => Ok(MessageLevel::Error),
      "warning" | "warn" => Ok(MessageLevel::Warning),
      "info" => Ok(MessageLevel::Info),
      "verbose" => Ok(MessageLevel::Verbose),
      "debug" => Ok(MessageLevel::Debug),
      other => Err(format!("unknown message level: {}", other)),
    }
  }
}

/// Receives build events. Every method defaults to doing nothing.
pub trait BuildListener {
  fn build_started(&self) {}

  fn build_finished(&self, _error: Option<&BuildError>) {}

  fn target_started(&self, _target: &str) {}

  fn target_finished(&self, _target: &str, _error: Option<&BuildError>) {}

  fn task_started(&self, _task: &str, _location: &Location) {}

  fn task_finished(&self, _task: &str, _error: Option<&BuildError>) {}

  /// A message logged by a task (`task` is its tag) or by the engine (`None`).
  fn message_logged(&self, _task: Option<&str>, _level: MessageLevel, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
  BuildStarted,
  BuildFinished { failed: bool },
  TargetStarted(String),
  TargetFinished { target: String, failed: bool },
  TaskStarted(String),
  TaskFinished { task: String, failed: bool },
  Message {
    task: Option<String>,
    level: MessageLevel,
    message: String,
  },
}

/// Listener that keeps every event in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
  events: Rc<RefCell<Vec<RecordedEvent>>>,
}

impl RecordingListener {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn events(&self) -> Vec<RecordedEvent> {
    self.events.borrow().clone()
  }

  /// Messages at `level` or more important, in order.
  pub fn messages(&self, level: MessageLevel) -> Vec<String> {
    self
      .events
      .borrow()
      .iter()
      .filter_map(|event| match event {
        RecordedEvent::Message { level: l, message, .. } if *l <= level => Some(message.clone()),
        _ => None,
      })
      .collect()
  }

  /// Names of targets in the order they started.
  pub fn targets_started(&self) -> Vec<String> {
    self
      .events
      .borrow()
      .iter()
      .filter_map(|event| match event {
        RecordedEvent::TargetStarted(name) => Some(name.clone()),
        _ => None,
      })
      .collect()
  }

  fn push(&self, event: RecordedEvent) {
    self.events.borrow_mut().push(event);
  }
}

impl BuildListener for RecordingListener {
  fn build_started(&self) {
    self.push(RecordedEvent::BuildStarted);
  }

  fn build_finished(&self, error: Option<&BuildError>) {
    self.push(RecordedEvent::BuildFinished { failed: error.is_some() });
  }

  fn target_started(&self, target: &str) {
    self.push(RecordedEvent::TargetStarted(target.to_string()));
  }

  fn target_finished(&self, target: &str, error: Option<&BuildError>) {
    self.push(RecordedEvent::TargetFinished {
      target: target.to_string(),
      failed: error.is_some(),
    });
  }

  fn task_started(&self, task: &str, _location: &Location) {
    self.push(RecordedEvent::TaskStarted(task.to_string()));
  }

  fn task_finished(&self, task: &str, error: Option<&BuildError>) {
    self.push(RecordedEvent::TaskFinished {
      task: task.to_string(),
      failed: error.is_some(),
    });
  }

  fn message_logged(&self, task: Option<&str>, level: MessageLevel, message: &str) {
    self.push(RecordedEvent::Message {
      task: task.map(str::to_string),
      level,
      message: message.to_string(),
    });
  }
}
