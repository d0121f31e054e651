//! The `path` data type.

use std::path::PathBuf;

use crate::component::{Component, Descriptor, downcast};
use crate::error::{BuildError, ErrorKind};

#[cfg(windows)]
const SEPARATOR: &str = ";";
#[cfg(not(windows))]
const SEPARATOR: &str = ":";

/// An ordered list of filesystem locations.
#[derive(Debug, Default, Clone)]
pub struct SearchPath {
  entries: Vec<PathBuf>,
}

impl SearchPath {
  pub fn entries(&self) -> &[PathBuf] {
    &self.entries
  }

  /// Descriptor of a `path` element, including nested `pathelement` and `path` children.
  pub(crate) fn descriptor() -> Descriptor<SearchPath> {
    Self::leaf_descriptor()
      .nested("pathelement", Self::entry_descriptor(), |path, entry| {
        path.entries.extend(entry.entries);
        Ok(())
      })
      .nested("path", Self::leaf_descriptor(), |path, nested| {
        path.entries.extend(nested.entries);
        Ok(())
      })
  }

  /// A nested `path`: attributes only.
  fn leaf_descriptor() -> Descriptor<SearchPath> {
    Self::entry_descriptor().resolved("refid", |path, project, id| {
      let component = project.reference(id)?;
      let Some(other) = downcast::<SearchPath>(component.as_ref()) else {
        return Err(BuildError::new(ErrorKind::WrongReferenceType {
          id: id.to_string(),
          expected: "path".to_string(),
        }));
      };
      path.entries.extend(other.entries.iter().cloned());
      Ok(())
    })
  }

  fn entry_descriptor() -> Descriptor<SearchPath> {
    Descriptor::<SearchPath>::new()
      .resolved("location", |path, project, value| {
        path.entries.push(project.resolve_file(value));
        Ok(())
      })
      .resolved("path", |path, project, value| {
        path
          .entries
          .extend(split_path(value).iter().map(|entry| project.resolve_file(entry)));
        Ok(())
      })
  }
}

impl Component for SearchPath {
  fn describe(&self) -> String {
    self
      .entries
      .iter()
      .map(|entry| entry.display().to_string())
      .collect::<Vec<_>>()
      .join(SEPARATOR)
  }
}

/// Split a path string on `:` and `;`.
///
/// A single letter followed by `:` and a slash is kept together as a drive prefix.
pub fn split_path(value: &str) -> Vec<String> {
  let mut entries = Vec::new();
  let mut current = String::new();
  let mut chars = value.chars().peekable();

  while let Some(ch) = chars.next() {
    match ch {
      ':' if current.len() == 1
        && current.chars().all(|c| c.is_ascii_alphabetic())
        && matches!(chars.peek(), Some('/' | '\\')) =>
      {
        current.push(ch);
      }
      ':' | ';' => {
        if !current.trim().is_empty() {
          entries.push(current.trim().to_string());
        }
        current.clear();
      }
      other => current.push(other),
    }
  }

  if !current.trim().is_empty() {
    entries.push(current.trim().to_string());
  }
  entries
}
