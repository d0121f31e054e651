//! Execution strategies.
//!
//! An [`Executor`] decides which targets run for a request and in what order.
//! All three strategies run strictly sequentially on the calling thread.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, error};

use super::graph::TargetGraph;
use crate::error::{BuildError, Result};
use crate::listener::MessageLevel;
use crate::project::Project;

pub trait Executor: fmt::Debug {
  fn execute_targets(&self, project: &mut Project, names: &[String]) -> Result<()>;

  /// The executor used for nested invocations such as `antcall`.
  fn sub_executor(&self) -> Rc<dyn Executor>;
}

/// Sorts and runs each requested target on its own.
///
/// Targets already run earlier in the same invocation are skipped, so a
/// prerequisite shared by several requested targets runs once.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExecutor;

impl Executor for DefaultExecutor {
  fn execute_targets(&self, project: &mut Project, names: &[String]) -> Result<()> {
    let graph = build_graph(project)?;
    let mut first_error = None;

    for name in names {
      let outcome = graph
        .topo_sort(std::slice::from_ref(name))
        .and_then(|order| run_sorted(project, &graph, &order));

      match outcome {
        Ok(()) => {}
        Err(err) if project.keep_going() => {
          first_error.get_or_insert(err);
        }
        Err(err) => return Err(err),
      }
    }

    first_error.map_or(Ok(()), Err)
  }

  fn sub_executor(&self) -> Rc<dyn Executor> {
    Rc::new(SingleCheckExecutor)
  }
}

/// Sorts the union of all requested targets once, then runs the merged order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleCheckExecutor;

impl Executor for SingleCheckExecutor {
  fn execute_targets(&self, project: &mut Project, names: &[String]) -> Result<()> {
    let graph = build_graph(project)?;
    let order = graph.topo_sort(names)?;
    run_sorted(project, &graph, &order)
  }

  fn sub_executor(&self) -> Rc<dyn Executor> {
    Rc::new(SingleCheckExecutor)
  }
}

/// Runs only the requested targets' own elements, without their prerequisites.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreDependenciesExecutor;

impl Executor for IgnoreDependenciesExecutor {
  fn execute_targets(&self, project: &mut Project, names: &[String]) -> Result<()> {
    let mut first_error = None;

    for name in names {
      match project.run_target(name) {
        Ok(()) => project.mark_executed(name),
        Err(err) if project.keep_going() => {
          error!(target = %name, error = %err, "target failed, continuing");
          project.mark_executed(name);
          project.mark_failed(name);
          first_error.get_or_insert(err);
        }
        Err(err) => return Err(err),
      }
    }

    first_error.map_or(Ok(()), Err)
  }

  fn sub_executor(&self) -> Rc<dyn Executor> {
    Rc::new(IgnoreDependenciesExecutor)
  }
}

fn build_graph(project: &Project) -> Result<TargetGraph> {
  TargetGraph::build(project.targets(), project.name().unwrap_or_default())
}

/// Run an already sorted target list.
///
/// Targets executed earlier in this invocation are skipped. In keep-going
/// mode a failure is remembered, targets whose prerequisites did not succeed
/// are skipped, and the first failure is returned at the end.
pub(crate) fn run_sorted(project: &mut Project, graph: &TargetGraph, order: &[String]) -> Result<()> {
  debug!(order = %order.join(", "), "build sequence");
  let mut first_error: Option<BuildError> = None;

  for name in order {
    if project.is_executed(name) {
      continue;
    }

    if let Some(blocker) = graph
      .dependencies(name)?
      .into_iter()
      .find(|dependency| !project.has_succeeded(dependency))
    {
      let message = format!("Cannot execute '{}' - '{}' failed or was not executed.", name, blocker);
      error!(target = %name, prerequisite = %blocker, "skipping target");
      project.log(MessageLevel::Error, &message);
      project.mark_executed(name);
      project.mark_failed(name);
      continue;
    }

    project.mark_executed(name);
    if let Err(err) = project.run_target(name) {
      project.mark_failed(name);
      if !project.keep_going() {
        return Err(err);
      }
      error!(target = %name, error = %err, "target failed, continuing");
      first_error.get_or_insert(err);
    }
  }

  first_error.map_or(Ok(()), Err)
}

/// Selectable execution strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
  #[default]
  Default,
  SingleCheck,
  IgnoreDeps,
}

impl ExecutorKind {
  pub fn create(self) -> Rc<dyn Executor> {
    match self {
      ExecutorKind::Default => Rc::new(DefaultExecutor),
      ExecutorKind::SingleCheck => Rc::new(SingleCheckExecutor),
      ExecutorKind::IgnoreDeps => Rc::new(IgnoreDependenciesExecutor),
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      ExecutorKind::Default => "default",
      ExecutorKind::SingleCheck => "single-check",
      ExecutorKind::IgnoreDeps => "ignore-deps",
    }
  }
}

impl fmt::Display for ExecutorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ExecutorKind {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s {
      "default" => Ok(ExecutorKind::Default),
      "single-check" | "single" => Ok(ExecutorKind::SingleCheck),
      "ignore-deps" | "ignore-dependencies" => Ok(ExecutorKind::IgnoreDeps),
      other => Err(format!(
        "unknown executor '{}', expected one of: default, single-check, ignore-deps",
        other
      )),
    }
  }
}
