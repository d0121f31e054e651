//! The parsed element tree.
//!
//! Elements live in an arena owned by the project and refer to their children
//! by [`ElementId`]. Each element carries a [`Wrapper`] holding the raw,
//! unexpanded attributes and text, plus the component it was last bound to.

use std::ops::{Index, IndexMut};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::component::Component;
use crate::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
  pub(crate) fn from_index(index: usize) -> Self {
    Self(index)
  }

  pub fn index(self) -> usize {
    self.0
  }
}

#[derive(Debug, Clone)]
pub struct Element {
  pub tag: String,
  pub location: Location,
  pub wrapper: Wrapper,
  pub children: Vec<ElementId>,
}

/// Deferred configuration of one element.
///
/// Attribute values and text are stored exactly as written; they are only
/// expanded when the element is bound.
#[derive(Debug, Clone, Default)]
pub struct Wrapper {
  pub attributes: IndexMap<String, String>,
  pub text: String,
  pub(crate) proxy: Option<Bound>,
}

impl Wrapper {
  /// Record an attribute. Returns false if the name was already present.
  pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
    let name = name.into();
    if self.attributes.contains_key(&name) {
      return false;
    }
    self.attributes.insert(name, value.into());
    true
  }

  pub fn add_text(&mut self, text: &str) {
    self.text.push_str(text);
  }

  pub fn id(&self) -> Option<&str> {
    self.attributes.get("id").map(String::as_str)
  }

  pub fn is_bound(&self) -> bool {
    self.proxy.is_some()
  }
}

/// A component bound to a wrapper during one invocation generation.
#[derive(Debug, Clone)]
pub(crate) struct Bound {
  pub generation: u64,
  pub component: Rc<dyn Component>,
}

#[derive(Debug, Clone, Default)]
pub struct ElementTree {
  nodes: Vec<Element>,
}

impl ElementTree {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn create(&mut self, tag: impl Into<String>, location: Location) -> ElementId {
    let id = ElementId(self.nodes.len());
    self.nodes.push(Element {
      tag: tag.into(),
      location,
      wrapper: Wrapper::default(),
      children: Vec::new(),
    });
    id
  }

  pub fn add_child(&mut self, parent: ElementId, child: ElementId) {
    self.nodes[parent.0].children.push(child);
  }

  pub(crate) fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Drop every element created after the tree had `len` elements.
  pub(crate) fn truncate(&mut self, len: usize) {
    self.nodes.truncate(len);
  }
}

impl Index<ElementId> for ElementTree {
  type Output = Element;

  fn index(&self, id: ElementId) -> &Element {
    &self.nodes[id.0]
  }
}

impl IndexMut<ElementId> for ElementTree {
  fn index_mut(&mut self, id: ElementId) -> &mut Element {
    &mut self.nodes[id.0]
  }
}
