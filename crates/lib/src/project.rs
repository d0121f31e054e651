//! The project: the context object threaded through parsing, binding and execution.
//!
//! A project owns the element arena, the targets, the property and reference
//! tables, the component registry and the executor. All mutation happens on
//! one thread; components receive `&mut Project` when they run.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::component::{Component, ComponentRegistry, Definition};
use crate::element::{Bound, ElementId, ElementTree};
use crate::error::{BuildError, ErrorKind, Result};
use crate::execute::{DefaultExecutor, Executor};
use crate::listener::{BuildListener, MessageLevel};
use crate::location::Location;
use crate::macros::MacroInstance;
use crate::property::PropertyTable;
use crate::target::{Target, TargetInfo};
use crate::tasks::register_builtins;

/// Built-in property names.
pub mod names {
  pub const BASEDIR: &str = "basedir";
  pub const FILE: &str = "antler.file";
  pub const PROJECT_NAME: &str = "antler.project.name";
  pub const DEFAULT_TARGET: &str = "antler.project.default-target";
  pub const INVOKED_TARGETS: &str = "antler.project.invoked-targets";

  /// Properties every project view carries, even one that inherits nothing.
  pub const BUILTIN: &[&str] = &[BASEDIR, FILE, PROJECT_NAME, DEFAULT_TARGET];
}

/// What an `id` refers to.
#[derive(Debug, Clone)]
pub enum Reference {
  /// A parsed element that may not be bound yet.
  Element(ElementId),
  /// A configured component.
  Object(Rc<dyn Component>),
  Target(String),
  Project,
}

/// Per-invocation execution bookkeeping.
#[derive(Debug, Default)]
struct Invocation {
  executed: HashSet<String>,
  failed: HashSet<String>,
}

pub struct Project {
  name: Option<String>,
  description: Option<String>,
  default_target: Option<String>,
  base_dir: PathBuf,
  build_file: Option<PathBuf>,
  targets: IndexMap<String, Target>,
  implicit: Target,
  tree: ElementTree,
  properties: PropertyTable,
  references: HashMap<String, Reference>,
  registry: ComponentRegistry,
  listeners: Vec<Rc<dyn BuildListener>>,
  keep_going: bool,
  executor: Rc<dyn Executor>,
  invocation: Invocation,
  generation: u64,
  generations: u64,
  binding: HashSet<ElementId>,
  current_target: Option<String>,
  tasks: Vec<String>,
}

impl fmt::Debug for Project {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Project")
      .field("name", &self.name)
      .field("base_dir", &self.base_dir)
      .field("targets", &self.targets.keys().collect::<Vec<_>>())
      .field("elements", &self.tree.len())
      .field("executor", &self.executor)
      .finish_non_exhaustive()
  }
}

impl Default for Project {
  fn default() -> Self {
    Self::new()
  }
}

impl Project {
  pub fn new() -> Self {
    let mut registry = ComponentRegistry::new();
    register_builtins(&mut registry);

    Self {
      name: None,
      description: None,
      default_target: None,
      base_dir: PathBuf::from("."),
      build_file: None,
      targets: IndexMap::new(),
      implicit: Target::new("", Location::UNKNOWN),
      tree: ElementTree::new(),
      properties: PropertyTable::new(),
      references: HashMap::new(),
      registry,
      listeners: Vec::new(),
      keep_going: false,
      executor: Rc::new(DefaultExecutor),
      invocation: Invocation::default(),
      generation: 0,
      generations: 0,
      binding: HashSet::new(),
      current_target: None,
      tasks: Vec::new(),
    }
  }

  // ---------------------------------------------------------------------------
  // Project attributes
  // ---------------------------------------------------------------------------

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn set_name(&mut self, name: &str) {
    self.name = Some(name.to_string());
    self.properties.set(names::PROJECT_NAME, name);
  }

  pub fn description(&self) -> Option<&str> {
    self.description.as_deref()
  }

  pub fn append_description(&mut self, text: &str) {
    match &mut self.description {
      Some(existing) => existing.push_str(text),
      None => self.description = Some(text.to_string()),
    }
  }

  pub fn default_target(&self) -> Option<&str> {
    self.default_target.as_deref()
  }

  pub fn set_default_target(&mut self, target: &str) {
    self.default_target = Some(target.to_string());
    self.properties.set(names::DEFAULT_TARGET, target);
  }

  pub fn base_dir(&self) -> &Path {
    &self.base_dir
  }

  pub fn set_base_dir(&mut self, dir: PathBuf) {
    self.properties.set(names::BASEDIR, dir.display().to_string());
    self.base_dir = dir;
  }

  pub fn build_file(&self) -> Option<&Path> {
    self.build_file.as_deref()
  }

  pub fn set_build_file(&mut self, file: &Path) {
    self.properties.set(names::FILE, file.display().to_string());
    self.build_file = Some(file.to_path_buf());
  }

  /// Resolve a path relative to the base directory.
  pub fn resolve_file(&self, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.base_dir.join(path)
    }
  }

  pub fn keep_going(&self) -> bool {
    self.keep_going
  }

  pub fn set_keep_going(&mut self, keep_going: bool) {
    self.keep_going = keep_going;
  }

  pub fn set_executor(&mut self, executor: Rc<dyn Executor>) {
    self.executor = executor;
  }

  pub fn add_listener(&mut self, listener: Rc<dyn BuildListener>) {
    self.listeners.push(listener);
  }

  // ---------------------------------------------------------------------------
  // Tables
  // ---------------------------------------------------------------------------

  pub fn tree(&self) -> &ElementTree {
    &self.tree
  }

  pub fn tree_mut(&mut self) -> &mut ElementTree {
    &mut self.tree
  }

  pub fn properties(&self) -> &PropertyTable {
    &self.properties
  }

  pub fn properties_mut(&mut self) -> &mut PropertyTable {
    &mut self.properties
  }

  pub fn property(&self, name: &str) -> Option<&str> {
    self.properties.get(name)
  }

  /// Expand `${...}` references against the current property table.
  pub fn expand(&self, input: &str) -> Result<String> {
    self.properties.expand(input)
  }

  pub fn registry(&self) -> &ComponentRegistry {
    &self.registry
  }

  pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
    &mut self.registry
  }

  pub fn add_reference(&mut self, id: &str, reference: Reference) {
    self.references.insert(id.to_string(), reference);
  }

  pub fn has_reference(&self, id: &str) -> bool {
    self.references.contains_key(id)
  }

  /// Look up a referenced component, binding the referenced element first if needed.
  pub fn reference(&mut self, id: &str) -> Result<Rc<dyn Component>> {
    match self.references.get(id).cloned() {
      Some(Reference::Object(component)) => Ok(component),
      Some(Reference::Element(element)) => self.bind(element),
      Some(Reference::Target(_)) => Err(BuildError::new(ErrorKind::WrongReferenceType {
        id: id.to_string(),
        expected: "task or data type (it is a target)".to_string(),
      })),
      Some(Reference::Project) => Err(BuildError::new(ErrorKind::WrongReferenceType {
        id: id.to_string(),
        expected: "task or data type (it is the project)".to_string(),
      })),
      None => Err(BuildError::new(ErrorKind::UnknownReference(id.to_string()))),
    }
  }

  // ---------------------------------------------------------------------------
  // Targets
  // ---------------------------------------------------------------------------

  pub fn targets(&self) -> &IndexMap<String, Target> {
    &self.targets
  }

  pub fn target(&self, name: &str) -> Option<&Target> {
    self.targets.get(name)
  }

  pub fn add_target(&mut self, target: Target) -> Result<()> {
    if self.targets.contains_key(&target.name) {
      return Err(BuildError::at(
        ErrorKind::DuplicateTarget(target.name.clone()),
        target.location.clone(),
      ));
    }
    self.targets.insert(target.name.clone(), target);
    Ok(())
  }

  /// Append an element to a target, or to the implicit target when `target` is `None`.
  pub fn add_to_target(&mut self, target: Option<&str>, element: ElementId) {
    let target = match target {
      Some(name) => self.targets.get_mut(name),
      None => Some(&mut self.implicit),
    };
    if let Some(target) = target {
      target.elements.push(element);
    }
  }

  pub fn implicit_target(&self) -> &Target {
    &self.implicit
  }

  /// Name of the target currently running; `Some("")` while top-level elements run.
  pub fn current_target(&self) -> Option<&str> {
    self.current_target.as_deref()
  }

  pub fn target_summaries(&self) -> Vec<TargetInfo> {
    self
      .targets
      .values()
      .map(|target| TargetInfo {
        name: target.name.clone(),
        description: target.description.clone(),
        depends: target.depends.clone(),
        default: self.default_target.as_deref() == Some(target.name.as_str()),
      })
      .collect()
  }

  // ---------------------------------------------------------------------------
  // Binding and execution
  // ---------------------------------------------------------------------------

  /// Bind an element to a configured component.
  ///
  /// Binding is idempotent within one invocation generation. The element's
  /// `id`, if any, refers to the configured component afterwards.
  pub fn bind(&mut self, element: ElementId) -> Result<Rc<dyn Component>> {
    if let Some(bound) = &self.tree[element].wrapper.proxy
      && bound.generation == self.generation
    {
      return Ok(bound.component.clone());
    }

    let tag = self.tree[element].tag.clone();
    let location = self.tree[element].location.clone();

    if !self.binding.insert(element) {
      return Err(BuildError::at(ErrorKind::CircularReference(tag), location));
    }
    let result = self.create_component(element, &tag);
    self.binding.remove(&element);
    let component = result.map_err(|e| e.located(&location))?;

    debug!(tag = %tag, location = %location, "bound element");
    self.tree[element].wrapper.proxy = Some(Bound {
      generation: self.generation,
      component: component.clone(),
    });
    if let Some(id) = self.tree[element].wrapper.id().map(str::to_string) {
      self.add_reference(&id, Reference::Object(component.clone()));
    }
    Ok(component)
  }

  fn create_component(&mut self, element: ElementId, tag: &str) -> Result<Rc<dyn Component>> {
    match self.registry.get(tag) {
      Some(Definition::Builtin(factory)) => factory.create(self, element),
      Some(Definition::Macro(definition)) => {
        let instance = MacroInstance::configure(definition, self, element)?;
        Ok(Rc::new(instance))
      }
      None => Err(BuildError::new(ErrorKind::UnknownType(tag.to_string()))),
    }
  }

  /// Bind and run one element, firing task events around it.
  pub fn perform(&mut self, element: ElementId) -> Result<()> {
    let tag = self.tree[element].tag.clone();
    let location = self.tree[element].location.clone();

    self.fire(|l| l.task_started(&tag, &location));
    self.tasks.push(tag.clone());
    let result = self
      .bind(element)
      .and_then(|component| component.execute(self, element))
      .map_err(|e| e.located(&location));
    self.tasks.pop();
    self.fire(|l| l.task_finished(&tag, result.as_ref().err()));

    result
  }

  /// Run the top-level elements that are not inside any target.
  pub fn run_implicit_target(&mut self) -> Result<()> {
    let target = self.implicit.clone();
    let previous = self.current_target.replace(String::new());
    let result = target.elements.iter().try_for_each(|&element| self.perform(element));
    self.current_target = previous;
    result
  }

  /// Run one target's elements, ignoring its dependencies.
  pub fn run_target(&mut self, name: &str) -> Result<()> {
    let Some(target) = self.targets.get(name).cloned() else {
      return Err(BuildError::new(ErrorKind::UnknownTarget {
        name: name.to_string(),
        project: self.name.clone().unwrap_or_default(),
        used_from: None,
      }));
    };

    self.fire(|l| l.target_started(name));
    let previous = self.current_target.replace(name.to_string());
    let result = self.run_target_elements(&target);
    self.current_target = previous;
    self.fire(|l| l.target_finished(name, result.as_ref().err()));

    result
  }

  fn run_target_elements(&mut self, target: &Target) -> Result<()> {
    if let Some(cond) = target.if_cond.as_deref().filter(|c| !c.is_empty())
      && !self.properties.test_guard(cond).map_err(|e| e.located(&target.location))?
    {
      debug!(target = %target.name, condition = %cond, "skipped because property is not set");
      return Ok(());
    }
    if let Some(cond) = target.unless_cond.as_deref().filter(|c| !c.is_empty())
      && self.properties.test_guard(cond).map_err(|e| e.located(&target.location))?
    {
      debug!(target = %target.name, condition = %cond, "skipped because property is set");
      return Ok(());
    }

    for &element in &target.elements {
      self.perform(element)?;
    }
    Ok(())
  }

  /// Run the requested targets through the configured executor.
  ///
  /// An empty request runs the default target.
  pub fn execute_targets(&mut self, names: &[String]) -> Result<()> {
    let names = if names.is_empty() {
      match &self.default_target {
        Some(default) => vec![default.clone()],
        None => return Err(BuildError::new(ErrorKind::NoTarget)),
      }
    } else {
      names.to_vec()
    };

    debug!(targets = %names.join(","), "executing targets");
    self.properties.set_user(names::INVOKED_TARGETS, names.join(","));
    let executor = self.executor.clone();
    executor.execute_targets(self, &names)
  }

  /// Run targets in a nested invocation with its own property view.
  ///
  /// The nested invocation uses the current executor's sub-executor, starts
  /// with nothing executed, and rebinds every element it touches. Property,
  /// registry and execution state are restored afterwards.
  pub fn execute_sub_invocation(&mut self, names: &[String], properties: PropertyTable) -> Result<()> {
    let executor = self.executor.sub_executor();
    let saved_executor = std::mem::replace(&mut self.executor, executor.clone());
    let saved_properties = std::mem::replace(&mut self.properties, properties);
    let saved_invocation = std::mem::take(&mut self.invocation);
    let saved_registry = self.registry.clone();
    let saved_target = self.current_target.take();
    let saved_generation = self.generation;
    self.generations += 1;
    self.generation = self.generations;

    debug!(targets = %names.join(","), generation = self.generation, "starting nested invocation");
    let result = executor.execute_targets(self, names);

    self.generation = saved_generation;
    self.current_target = saved_target;
    self.registry = saved_registry;
    self.invocation = saved_invocation;
    self.properties = saved_properties;
    self.executor = saved_executor;

    result
  }

  pub fn is_executed(&self, name: &str) -> bool {
    self.invocation.executed.contains(name)
  }

  pub fn has_succeeded(&self, name: &str) -> bool {
    self.invocation.executed.contains(name) && !self.invocation.failed.contains(name)
  }

  pub(crate) fn mark_executed(&mut self, name: &str) {
    self.invocation.executed.insert(name.to_string());
  }

  pub(crate) fn mark_failed(&mut self, name: &str) {
    self.invocation.failed.insert(name.to_string());
  }

  // ---------------------------------------------------------------------------
  // Events
  // ---------------------------------------------------------------------------

  /// Log a message on behalf of the running task.
  pub fn log(&self, level: MessageLevel, message: &str) {
    let task = self.tasks.last().map(String::as_str);
    self.fire(|l| l.message_logged(task, level, message));
  }

  pub(crate) fn fire(&self, event: impl Fn(&dyn BuildListener)) {
    for listener in &self.listeners {
      event(listener.as_ref());
    }
  }
}
