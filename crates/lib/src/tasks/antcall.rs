//! The `antcall` task: run a target of the same project in a nested invocation.

use tracing::debug;

use crate::component::{Component, Descriptor};
use crate::element::ElementId;
use crate::error::{BuildError, ErrorKind, Result};
use crate::execute::TargetGraph;
use crate::project::{Project, names};

/// A property passed to the called target.
#[derive(Debug, Default)]
pub struct Param {
  name: String,
  value: Option<String>,
}

#[derive(Debug)]
pub struct AntCall {
  target: String,
  inherit_all: bool,
  params: Vec<Param>,
}

impl Default for AntCall {
  fn default() -> Self {
    Self {
      target: String::new(),
      inherit_all: true,
      params: Vec::new(),
    }
  }
}

impl AntCall {
  pub(crate) fn descriptor() -> Descriptor<AntCall> {
    Descriptor::<AntCall>::new()
      .attr("target", |call, value| call.target = value)
      .flag("inheritall", |call, value| call.inherit_all = value)
      .require("target")
      .nested("param", param_descriptor(), |call, param| {
        call.params.push(param);
        Ok(())
      })
  }

  /// Reject calls that would recurse into the calling target.
  fn check_owner(&self, project: &Project) -> Result<()> {
    let Some(owner) = project.current_target() else {
      return Ok(());
    };
    if owner.is_empty() {
      return Err(usage("antcall must not be used at the top level."));
    }
    if owner == self.target {
      return Err(usage("antcall task calling its own parent target."));
    }

    let graph = TargetGraph::build(project.targets(), project.name().unwrap_or_default())?;
    if graph.depends_on(&self.target, owner) {
      return Err(usage(&format!(
        "antcall task calling a target that depends on its parent target '{owner}'."
      )));
    }
    Ok(())
  }
}

fn param_descriptor() -> Descriptor<Param> {
  Descriptor::<Param>::new()
    .attr("name", |param, value| param.name = value)
    .attr("value", |param, value| param.value = Some(value))
    .resolved("location", |param, project, value| {
      param.value = Some(project.resolve_file(value).display().to_string());
      Ok(())
    })
    .require("name")
    .finish(|param, _| match param.value {
      Some(_) => Ok(()),
      None => Err(usage("You must specify value or location with the name attribute")),
    })
}

fn usage(message: &str) -> BuildError {
  BuildError::new(ErrorKind::InvalidUsage(message.to_string()))
}

impl Component for AntCall {
  fn execute(&self, project: &mut Project, _element: ElementId) -> Result<()> {
    self.check_owner(project)?;

    let mut properties = project.properties().child_view(self.inherit_all);
    for name in names::BUILTIN {
      if let Some(value) = project.property(name) {
        properties.set_new(name, value);
      }
    }
    for param in &self.params {
      properties.set_user(&param.name, param.value.clone().unwrap_or_default());
    }

    debug!(target = %self.target, inherit_all = self.inherit_all, params = self.params.len(), "calling target");
    project.execute_sub_invocation(std::slice::from_ref(&self.target), properties)
  }

  fn describe(&self) -> String {
    self.target.clone()
  }
}
