//! Error types for parsing, binding and executing builds.
//!
//! Every core operation returns [`BuildError`], which pairs an [`ErrorKind`]
//! with the [`Location`] of the element that caused it. Errors created deep in
//! a component usually start out without a location and get stamped by the
//! caller that knows which element was running.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::location::Location;
use crate::macros::MacroError;

/// Everything that can go wrong in a build.
#[derive(Debug, Error)]
pub enum ErrorKind {
  #[error("XML syntax error: {0}")]
  Xml(String),

  #[error("unable to read {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Unexpected element \"{0}\"")]
  UnexpectedElement(String),

  #[error("Unexpected attribute \"{0}\"")]
  UnexpectedAttribute(String),

  #[error("Unexpected text \"{0}\"")]
  UnexpectedText(String),

  #[error("{element} element appears without a {attribute} attribute")]
  MissingAttribute { element: String, attribute: String },

  #[error("name attribute must not be empty")]
  EmptyTargetName,

  #[error("Duplicate target '{0}'")]
  DuplicateTarget(String),

  #[error("Syntax Error: depends attribute of target \"{target}\" {problem}")]
  MalformedDepends { target: String, problem: String },

  #[error("Problem: failed to create task or type {0}")]
  UnknownType(String),

  #[error("{element} doesn't support the \"{attribute}\" attribute")]
  UnsupportedAttribute { element: String, attribute: String },

  #[error("{element} doesn't support the nested \"{child}\" element")]
  UnsupportedElement { element: String, child: String },

  #[error("{0} doesn't support nested text data")]
  UnsupportedText(String),

  #[error("{value} is not a legal value for attribute \"{attribute}\": {reason}")]
  InvalidValue {
    attribute: String,
    value: String,
    reason: String,
  },

  #[error("Syntax error in property: {0}")]
  PropertySyntax(String),

  #[error("Reference {0} not found.")]
  UnknownReference(String),

  #[error("Reference {id} is not a {expected}")]
  WrongReferenceType { id: String, expected: String },

  #[error("Circular reference to {0}")]
  CircularReference(String),

  #[error("Target \"{name}\" does not exist in the project \"{project}\".{}", used_from_note(.used_from))]
  UnknownTarget {
    name: String,
    project: String,
    used_from: Option<String>,
  },

  #[error("Circular dependency: {}", .0.join(" <- "))]
  CircularDependency(Vec<String>),

  #[error("No target specified and the project has no default target")]
  NoTarget,

  #[error("{0}")]
  InvalidUsage(String),

  #[error(transparent)]
  Macro(#[from] MacroError),

  #[error("{message}")]
  Failed { message: String, status: Option<i32> },

  #[error("The following error occurred while executing this line:\n{0}")]
  Nested(Box<BuildError>),
}

fn used_from_note(used_from: &Option<String>) -> String {
  match used_from {
    Some(target) => format!(" It is used from target \"{}\".", target),
    None => String::new(),
  }
}

/// An [`ErrorKind`] plus the source location it applies to.
#[derive(Debug)]
pub struct BuildError {
  kind: Box<ErrorKind>,
  location: Location,
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

impl BuildError {
  pub fn new(kind: ErrorKind) -> Self {
    Self::at(kind, Location::UNKNOWN)
  }

  pub fn at(kind: ErrorKind, location: Location) -> Self {
    Self {
      kind: Box::new(kind),
      location,
    }
  }

  /// A task failure with the given message.
  pub fn failed(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Failed {
      message: message.into(),
      status: None,
    })
  }

  pub fn kind(&self) -> &ErrorKind {
    &self.kind
  }

  pub fn location(&self) -> &Location {
    &self.location
  }

  /// Stamp `location` onto the error unless it already carries one.
  pub fn located(mut self, location: &Location) -> Self {
    if !self.location.is_known() {
      self.location = location.clone();
    }
    self
  }

  /// Replace the location unconditionally.
  pub fn relocated(mut self, location: &Location) -> Self {
    self.location = location.clone();
    self
  }

  /// Wrap a located error so that it is reported from `location` while still
  /// showing the line it originally came from.
  pub fn nested_at(self, location: &Location) -> Self {
    if self.location.is_known() {
      Self::at(ErrorKind::Nested(Box::new(self)), location.clone())
    } else {
      self.relocated(location)
    }
  }

  /// The exit status requested by a failing task, if any.
  pub fn exit_status(&self) -> Option<i32> {
    match self.kind() {
      ErrorKind::Failed { status, .. } => *status,
      ErrorKind::Nested(inner) => inner.exit_status(),
      _ => None,
    }
  }
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.location.is_known() {
      write!(f, "{}: {}", self.location, self.kind)
    } else {
      write!(f, "{}", self.kind)
    }
  }
}

impl std::error::Error for BuildError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self.kind() {
      ErrorKind::Io { source, .. } => Some(source),
      _ => None,
    }
  }
}

impl From<ErrorKind> for BuildError {
  fn from(kind: ErrorKind) -> Self {
    Self::new(kind)
  }
}

impl From<MacroError> for BuildError {
  fn from(err: MacroError) -> Self {
    Self::new(ErrorKind::Macro(err))
  }
}
