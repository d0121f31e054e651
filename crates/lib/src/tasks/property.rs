//! The `property` task.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::component::{Component, Descriptor};
use crate::element::ElementId;
use crate::error::{BuildError, ErrorKind, Result};
use crate::listener::MessageLevel;
use crate::project::Project;

/// Sets properties that are not set yet.
///
/// One of `name` (with `value`, `location`, `refid` or text), `file` or
/// `environment` selects what gets set.
#[derive(Debug, Default)]
pub struct PropertyTask {
  name: Option<String>,
  value: Option<String>,
  refid: Option<String>,
  file: Option<PathBuf>,
  prefix: Option<String>,
  environment: Option<String>,
}

impl PropertyTask {
  pub(crate) fn descriptor() -> Descriptor<PropertyTask> {
    Descriptor::<PropertyTask>::new()
      .attr("name", |p, value| p.name = Some(value))
      .attr("value", |p, value| p.value = Some(value))
      .resolved("location", |p, project, value| {
        p.value = Some(project.resolve_file(value).display().to_string());
        Ok(())
      })
      .attr("refid", |p, value| p.refid = Some(value))
      .resolved("file", |p, project, value| {
        p.file = Some(project.resolve_file(value));
        Ok(())
      })
      .attr("prefix", |p, value| p.prefix = Some(value))
      .attr("environment", |p, value| p.environment = Some(value))
      .text(|p, text| p.value.get_or_insert_with(String::new).push_str(&text))
  }

  fn check(&self) -> Result<()> {
    let problem = if self.name.is_some() {
      (self.value.is_none() && self.refid.is_none()).then_some("You must specify value, location or refid with the name attribute")
    } else if self.file.is_none() && self.environment.is_none() {
      Some("You must specify file or environment when not using the name attribute")
    } else {
      None
    };
    let problem = problem.or_else(|| {
      (self.file.is_none() && self.prefix.is_some()).then_some("Prefix is only valid when loading from a file")
    });

    match problem {
      Some(message) => Err(BuildError::new(ErrorKind::InvalidUsage(message.to_string()))),
      None => Ok(()),
    }
  }

  fn load_file(&self, project: &mut Project, file: &Path) -> Result<()> {
    if !file.exists() {
      project.log(
        MessageLevel::Verbose,
        &format!("Unable to find property file: {}", file.display()),
      );
      return Ok(());
    }

    let source = std::fs::read_to_string(file).map_err(|source| {
      BuildError::new(ErrorKind::Io {
        path: file.to_path_buf(),
        source,
      })
    })?;

    let prefix = self.prefix.as_deref().map(with_dot).unwrap_or_default();
    let entries = parse_properties(&source);
    debug!(file = %file.display(), count = entries.len(), "loading properties");
    for (key, raw) in entries {
      // later entries may refer to earlier ones
      let value = project.expand(&raw)?;
      project.properties_mut().set_new(&format!("{prefix}{key}"), value);
    }
    Ok(())
  }

  fn load_environment(&self, project: &mut Project, prefix: &str) {
    let prefix = with_dot(prefix);
    for (key, value) in std::env::vars() {
      project.properties_mut().set_new(&format!("{prefix}{key}"), value);
    }
  }
}

impl Component for PropertyTask {
  fn execute(&self, project: &mut Project, _element: ElementId) -> Result<()> {
    self.check()?;

    if let Some(name) = &self.name {
      let value = match (&self.value, &self.refid) {
        (Some(value), _) => value.clone(),
        (None, Some(refid)) => project.reference(refid)?.describe(),
        (None, None) => String::new(),
      };
      project.properties_mut().set_new(name, value);
    }

    if let Some(file) = &self.file {
      self.load_file(project, file)?;
    }

    if let Some(prefix) = &self.environment {
      self.load_environment(project, prefix);
    }

    Ok(())
  }
}

fn with_dot(prefix: &str) -> String {
  if prefix.ends_with('.') {
    prefix.to_string()
  } else {
    format!("{prefix}.")
  }
}

/// Parse `key=value` / `key: value` lines.
///
/// Blank lines and lines starting with `#` or `!` are skipped. A trailing
/// backslash joins the next line. Values keep their `${...}` references.
pub fn parse_properties(source: &str) -> Vec<(String, String)> {
  let mut entries = Vec::new();
  let mut pending = String::new();

  for line in source.lines() {
    let line = line.trim_start();
    if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
      continue;
    }

    if let Some(continued) = line.strip_suffix('\\') {
      pending.push_str(continued);
      continue;
    }
    pending.push_str(line);

    let logical = std::mem::take(&mut pending);
    if let Some(entry) = split_entry(&logical) {
      entries.push(entry);
    }
  }

  if !pending.is_empty()
    && let Some(entry) = split_entry(&pending)
  {
    entries.push(entry);
  }

  entries
}

fn split_entry(line: &str) -> Option<(String, String)> {
  let (key, value) = match line.find(['=', ':']) {
    Some(pos) => (&line[..pos], &line[pos + 1..]),
    None => match line.split_once(char::is_whitespace) {
      Some((key, value)) => (key, value),
      None => (line, ""),
    },
  };
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  Some((key.to_string(), value.trim_start().to_string()))
}
