//! Components and their binding descriptors.
//!
//! A component is the live object an element turns into once bound: a task,
//! a data type or a macro instance. Built-in component types describe how to
//! configure themselves with a [`Descriptor`], an explicit table of attribute
//! setters, a text acceptor and nested-element adders keyed by name.
//!
//! ```ignore
//! Descriptor::<Echo>::new()
//!   .attr("message", |echo, value| echo.message = value)
//!   .choice("level", MessageLevel::NAMES, |echo, value| echo.level = value.parse().unwrap_or_default())
//!   .text(|echo, text| echo.message.push_str(&text))
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::element::ElementId;
use crate::error::{BuildError, ErrorKind, Result};
use crate::macros::MacroDefinition;
use crate::project::Project;
use crate::property::to_boolean;

/// Upcast helper so components can be downcast through `dyn Component`.
pub trait AsAny {
  fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// A bound, configured element.
pub trait Component: fmt::Debug + AsAny {
  /// Run the component. Data types keep the default, which does nothing.
  fn execute(&self, _project: &mut Project, _element: ElementId) -> Result<()> {
    Ok(())
  }

  /// Text form used when the component is referenced as a string, e.g. by `property refid`.
  fn describe(&self) -> String {
    String::new()
  }
}

/// Downcast a component to its concrete type.
pub fn downcast<T: Component + 'static>(component: &dyn Component) -> Option<&T> {
  component.as_any().downcast_ref::<T>()
}

type AttributeSetter<T> = Box<dyn Fn(&mut T, &mut Project, &str) -> Result<()>>;
type TextSetter<T> = Box<dyn Fn(&mut T, String)>;
type NestedAdder<T> = Box<dyn Fn(&mut T, &mut Project, ElementId) -> Result<()>>;
type Finisher<T> = Box<dyn Fn(&mut T, &mut Project) -> Result<()>>;

/// How a component treats nested elements.
pub enum Children<T> {
  /// Nested elements are an error.
  None,
  /// Container: children are kept unbound and bound right before they run.
  Tasks(fn(&mut T, ElementId)),
  /// Nested configuration, bound eagerly through the named adders.
  Nested(IndexMap<&'static str, NestedAdder<T>>),
}

/// The binding table of one component type.
pub struct Descriptor<T> {
  attributes: IndexMap<&'static str, AttributeSetter<T>>,
  required: Vec<&'static str>,
  text: Option<TextSetter<T>>,
  children: Children<T>,
  finish: Option<Finisher<T>>,
}

impl<T> Default for Descriptor<T> {
  fn default() -> Self {
    Self {
      attributes: IndexMap::new(),
      required: Vec::new(),
      text: None,
      children: Children::None,
      finish: None,
    }
  }
}

impl<T: 'static> Descriptor<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Plain string attribute.
  pub fn attr(self, name: &'static str, set: impl Fn(&mut T, String) + 'static) -> Self {
    self.resolved(name, move |object, _, value| {
      set(object, value.to_string());
      Ok(())
    })
  }

  /// String attribute whose setter may reject the value.
  pub fn attr_checked(self, name: &'static str, set: impl Fn(&mut T, &str) -> Result<()> + 'static) -> Self {
    self.resolved(name, move |object, _, value| set(object, value))
  }

  /// Boolean attribute; `true`, `yes` and `on` are true.
  pub fn flag(self, name: &'static str, set: impl Fn(&mut T, bool) + 'static) -> Self {
    self.resolved(name, move |object, _, value| {
      set(object, to_boolean(value));
      Ok(())
    })
  }

  /// Integer attribute.
  pub fn number(self, name: &'static str, set: impl Fn(&mut T, i64) + 'static) -> Self {
    self.resolved(name, move |object, _, value| {
      let parsed = value.trim().parse::<i64>().map_err(|err| {
        BuildError::new(ErrorKind::InvalidValue {
          attribute: name.to_string(),
          value: value.to_string(),
          reason: err.to_string(),
        })
      })?;
      set(object, parsed);
      Ok(())
    })
  }

  /// Enumerated attribute; matching is case-insensitive and the setter gets the canonical spelling.
  pub fn choice(
    self,
    name: &'static str,
    allowed: &'static [&'static str],
    set: impl Fn(&mut T, &'static str) + 'static,
  ) -> Self {
    self.resolved(name, move |object, _, value| {
      match allowed.iter().find(|candidate| candidate.eq_ignore_ascii_case(value)) {
        Some(canonical) => {
          set(object, canonical);
          Ok(())
        }
        None => Err(BuildError::new(ErrorKind::InvalidValue {
          attribute: name.to_string(),
          value: value.to_string(),
          reason: format!("use one of {}", allowed.join(", ")),
        })),
      }
    })
  }

  /// Attribute whose setter needs the project, e.g. to resolve a file or a reference.
  pub fn resolved(mut self, name: &'static str, set: impl Fn(&mut T, &mut Project, &str) -> Result<()> + 'static) -> Self {
    self.attributes.insert(name, Box::new(set));
    self
  }

  pub fn require(mut self, name: &'static str) -> Self {
    self.required.push(name);
    self
  }

  /// Accept nested text. The text is property-expanded before the setter sees it.
  pub fn text(mut self, set: impl Fn(&mut T, String) + 'static) -> Self {
    self.text = Some(Box::new(set));
    self
  }

  /// Make this a container of tasks.
  pub fn tasks(mut self, add: fn(&mut T, ElementId)) -> Self {
    self.children = Children::Tasks(add);
    self
  }

  /// Accept a nested element configured through its own descriptor.
  pub fn nested<C: Default + 'static>(
    self,
    name: &'static str,
    descriptor: Descriptor<C>,
    add: impl Fn(&mut T, C) -> Result<()> + 'static,
  ) -> Self {
    self.raw_nested_with_project(name, move |object, project, element| {
      let child = descriptor.configure(project, element)?;
      add(object, child)
    })
  }

  /// Accept a nested element without configuring it.
  pub fn raw_nested(self, name: &'static str, add: impl Fn(&mut T, ElementId) -> Result<()> + 'static) -> Self {
    self.raw_nested_with_project(name, move |object, _, element| add(object, element))
  }

  fn raw_nested_with_project(
    mut self,
    name: &'static str,
    add: impl Fn(&mut T, &mut Project, ElementId) -> Result<()> + 'static,
  ) -> Self {
    match &mut self.children {
      Children::Nested(adders) => {
        adders.insert(name, Box::new(add));
      }
      _ => {
        let mut adders: IndexMap<&'static str, NestedAdder<T>> = IndexMap::new();
        adders.insert(name, Box::new(add));
        self.children = Children::Nested(adders);
      }
    }
    self
  }

  /// Validation that runs once all attributes, text and children are applied.
  pub fn finish(mut self, check: impl Fn(&mut T, &mut Project) -> Result<()> + 'static) -> Self {
    self.finish = Some(Box::new(check));
    self
  }
}

impl<T: Default + 'static> Descriptor<T> {
  /// Create a `T` and configure it from the element's wrapper.
  ///
  /// Attributes are expanded against the current property table and applied
  /// in document order. `id` is never applied; `description` is accepted by
  /// every component.
  pub fn configure(&self, project: &mut Project, element: ElementId) -> Result<T> {
    let node = &project.tree()[element];
    let tag = node.tag.clone();
    let location = node.location.clone();
    let attributes = node.wrapper.attributes.clone();
    let text = node.wrapper.text.clone();
    let children = node.children.clone();

    let mut object = T::default();

    for (name, raw) in &attributes {
      if name == "id" {
        continue;
      }
      match self.attributes.get(name.as_str()) {
        Some(set) => {
          let value = project.expand(raw).map_err(|e| e.located(&location))?;
          set(&mut object, project, &value).map_err(|e| e.located(&location))?;
        }
        None if name == "description" => {}
        None => {
          return Err(BuildError::at(
            ErrorKind::UnsupportedAttribute {
              element: tag,
              attribute: name.clone(),
            },
            location,
          ));
        }
      }
    }

    if let Some(missing) = self.required.iter().find(|name| !attributes.contains_key(**name)) {
      return Err(BuildError::at(
        ErrorKind::MissingAttribute {
          element: tag,
          attribute: missing.to_string(),
        },
        location,
      ));
    }

    if !text.is_empty() {
      match &self.text {
        Some(set) => {
          let value = project.expand(&text).map_err(|e| e.located(&location))?;
          set(&mut object, value);
        }
        None if text.trim().is_empty() => {}
        None => return Err(BuildError::at(ErrorKind::UnsupportedText(tag), location)),
      }
    }

    match &self.children {
      Children::None => {
        if let Some(&child) = children.first() {
          let child = &project.tree()[child];
          return Err(BuildError::at(
            ErrorKind::UnsupportedElement {
              element: tag,
              child: child.tag.clone(),
            },
            child.location.clone(),
          ));
        }
      }
      Children::Tasks(add) => {
        for &child in &children {
          add(&mut object, child);
        }
      }
      Children::Nested(adders) => {
        for &child in &children {
          let child_node = &project.tree()[child];
          let child_location = child_node.location.clone();
          match adders.get(child_node.tag.as_str()) {
            Some(add) => add(&mut object, project, child).map_err(|e| e.located(&child_location))?,
            None => {
              return Err(BuildError::at(
                ErrorKind::UnsupportedElement {
                  element: tag,
                  child: child_node.tag.clone(),
                },
                child_location,
              ));
            }
          }
        }
      }
    }

    if let Some(finish) = &self.finish {
      finish(&mut object, project).map_err(|e| e.located(&location))?;
    }

    Ok(object)
  }
}

/// Creates configured components for one tag.
pub trait ComponentFactory {
  fn create(&self, project: &mut Project, element: ElementId) -> Result<Rc<dyn Component>>;
}

impl<T: Component + Default + 'static> ComponentFactory for Descriptor<T> {
  fn create(&self, project: &mut Project, element: ElementId) -> Result<Rc<dyn Component>> {
    Ok(Rc::new(self.configure(project, element)?))
  }
}

/// What a tag resolves to.
#[derive(Clone)]
pub enum Definition {
  Builtin(Rc<dyn ComponentFactory>),
  Macro(Rc<MacroDefinition>),
}

/// Maps lower-case tag names to component definitions.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
  definitions: HashMap<String, Definition>,
}

impl ComponentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, name: &str, factory: impl ComponentFactory + 'static) {
    self
      .definitions
      .insert(name.to_ascii_lowercase(), Definition::Builtin(Rc::new(factory)));
  }

  pub fn register_macro(&mut self, definition: MacroDefinition) {
    let name = definition.name.clone();
    if self.definitions.contains_key(&name) {
      debug!(name = %name, "replacing existing definition");
    }
    self.definitions.insert(name, Definition::Macro(Rc::new(definition)));
  }

  pub fn get(&self, name: &str) -> Option<Definition> {
    self.definitions.get(name).cloned()
  }

  /// Prototype bodies of the registered macros.
  pub(crate) fn macro_bodies(&self) -> impl Iterator<Item = ElementId> + '_ {
    self.definitions.values().filter_map(|definition| match definition {
      Definition::Macro(definition) => Some(definition.body),
      Definition::Builtin(_) => None,
    })
  }

  pub fn contains(&self, name: &str) -> bool {
    self.definitions.contains_key(name)
  }
}

impl fmt::Debug for ComponentRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut names: Vec<_> = self.definitions.keys().collect();
    names.sort();
    f.debug_struct("ComponentRegistry").field("definitions", &names).finish()
  }
}
