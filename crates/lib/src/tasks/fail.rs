use crate::component::{Component, Descriptor};
use crate::element::ElementId;
use crate::error::{BuildError, ErrorKind, Result};
use crate::project::Project;

/// Stops the build with a task failure.
#[derive(Debug, Default)]
pub struct Fail {
  message: Option<String>,
  if_cond: Option<String>,
  unless_cond: Option<String>,
  status: Option<i32>,
}

impl Fail {
  pub(crate) fn descriptor() -> Descriptor<Fail> {
    Descriptor::<Fail>::new()
      .attr("message", |fail, value| fail.message = Some(value))
      .attr("if", |fail, value| fail.if_cond = Some(value))
      .attr("unless", |fail, value| fail.unless_cond = Some(value))
      .number("status", |fail, value| fail.status = i32::try_from(value).ok())
      .text(|fail, text| fail.message.get_or_insert_with(String::new).push_str(&text))
  }

  fn should_fail(&self, project: &Project) -> Result<bool> {
    if let Some(cond) = self.if_cond.as_deref()
      && !project.properties().test_guard(cond)?
    {
      return Ok(false);
    }
    if let Some(cond) = self.unless_cond.as_deref()
      && project.properties().test_guard(cond)?
    {
      return Ok(false);
    }
    Ok(true)
  }
}

impl Component for Fail {
  fn execute(&self, project: &mut Project, _element: ElementId) -> Result<()> {
    if !self.should_fail(project)? {
      return Ok(());
    }

    let message = match self.message.as_deref().map(str::trim) {
      Some(message) if !message.is_empty() => message.to_string(),
      _ => "No message".to_string(),
    };
    Err(BuildError::new(ErrorKind::Failed {
      message,
      status: self.status,
    }))
  }
}
