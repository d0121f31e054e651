//! Targets: named, orderable units of work.

use serde::Serialize;

use crate::element::ElementId;
use crate::error::{BuildError, ErrorKind, Result};
use crate::location::Location;

#[derive(Debug, Clone, Default)]
pub struct Target {
  pub name: String,
  /// Prerequisites in declared order.
  pub depends: Vec<String>,
  pub if_cond: Option<String>,
  pub unless_cond: Option<String>,
  pub description: Option<String>,
  pub location: Location,
  pub elements: Vec<ElementId>,
}

impl Target {
  pub fn new(name: impl Into<String>, location: Location) -> Self {
    Self {
      name: name.into(),
      location,
      ..Default::default()
    }
  }
}

/// Summary of a target for listings.
#[derive(Debug, Clone, Serialize)]
pub struct TargetInfo {
  pub name: String,
  pub description: Option<String>,
  pub depends: Vec<String>,
  pub default: bool,
}

/// Split a `depends` attribute into target names.
///
/// Names are separated by commas and trimmed. Empty names and a trailing
/// comma are syntax errors.
pub fn parse_depends(target: &str, depends: &str) -> Result<Vec<String>> {
  if depends.trim().is_empty() {
    return Ok(Vec::new());
  }

  let malformed = |problem: &str| {
    BuildError::new(ErrorKind::MalformedDepends {
      target: target.to_string(),
      problem: problem.to_string(),
    })
  };

  if depends.trim_end().ends_with(',') {
    return Err(malformed("ends with a \",\" character"));
  }

  depends
    .split(',')
    .map(|token| {
      let token = token.trim();
      if token.is_empty() {
        Err(malformed("contains an empty string."))
      } else {
        Ok(token.to_string())
      }
    })
    .collect()
}
