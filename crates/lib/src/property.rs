//! The property table and `${name}` expansion.
//!
//! Properties come in two layers. User properties (command line, `antcall`
//! parameters) always win and can never be changed from build-file code.
//! Normal properties are set by tasks and are first-write-wins unless an
//! engine call site overwrites them explicitly.
//!
//! # Expansion
//!
//! - `${name}` is replaced by the property value
//! - `${name}` for an undefined property is left verbatim
//! - `$$` yields a single `$`
//! - `$` followed by anything else is kept as is
//! - an unterminated `${` is an error

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{BuildError, ErrorKind, Result};

#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
  user: IndexMap<String, String>,
  normal: IndexMap<String, String>,
}

impl PropertyTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self
      .user
      .get(name)
      .or_else(|| self.normal.get(name))
      .map(String::as_str)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.user.contains_key(name) || self.normal.contains_key(name)
  }

  /// Set a property only if it is not defined yet. Returns whether the value was stored.
  pub fn set_new(&mut self, name: &str, value: impl Into<String>) -> bool {
    if self.contains(name) {
      debug!(property = %name, "override ignored for property");
      return false;
    }
    self.normal.insert(name.to_string(), value.into());
    true
  }

  /// Set or overwrite a normal property. User properties are left untouched.
  pub fn set(&mut self, name: &str, value: impl Into<String>) {
    if self.user.contains_key(name) {
      debug!(property = %name, "override ignored for user property");
      return;
    }
    self.normal.insert(name.to_string(), value.into());
  }

  pub fn set_user(&mut self, name: &str, value: impl Into<String>) {
    self.normal.shift_remove(name);
    self.user.insert(name.to_string(), value.into());
  }

  pub fn is_user(&self, name: &str) -> bool {
    self.user.contains_key(name)
  }

  /// All properties, user properties first.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .user
      .iter()
      .chain(self.normal.iter())
      .map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// A copy of this table for a nested invocation. Writes to the copy never
  /// reach this table.
  pub fn child_view(&self, inherit_all: bool) -> PropertyTable {
    if inherit_all {
      self.clone()
    } else {
      PropertyTable {
        user: self.user.clone(),
        normal: IndexMap::new(),
      }
    }
  }

  pub fn expand(&self, input: &str) -> Result<String> {
    if !input.contains('$') {
      return Ok(input.to_string());
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
      out.push_str(&rest[..pos]);
      let after = &rest[pos + 1..];

      if let Some(body) = after.strip_prefix('{') {
        let Some(end) = body.find('}') else {
          return Err(BuildError::new(ErrorKind::PropertySyntax(input.to_string())));
        };
        let name = &body[..end];
        match self.get(name) {
          Some(value) => out.push_str(value),
          None => {
            out.push_str("${");
            out.push_str(name);
            out.push('}');
          }
        }
        rest = &body[end + 1..];
      } else if let Some(tail) = after.strip_prefix('$') {
        out.push('$');
        rest = tail;
      } else {
        out.push('$');
        rest = after;
      }
    }

    out.push_str(rest);
    Ok(out)
  }

  /// Evaluate an `if`/`unless` guard.
  ///
  /// The guard is expanded first; `true`/`yes`/`on` and `false`/`no`/`off`
  /// are literal answers, anything else names a property whose presence decides.
  pub fn test_guard(&self, guard: &str) -> Result<bool> {
    let expanded = self.expand(guard)?;
    Ok(match expanded.to_ascii_lowercase().as_str() {
      "true" | "yes" | "on" => true,
      "false" | "no" | "off" => false,
      _ => self.contains(&expanded),
    })
  }
}

/// Boolean coercion for attribute values.
pub fn to_boolean(value: &str) -> bool {
  matches!(value.to_ascii_lowercase().as_str(), "true" | "yes" | "on")
}
