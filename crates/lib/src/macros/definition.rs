//! Macro definitions and the `macrodef` task that declares them.

use indexmap::IndexMap;
use tracing::debug;

use super::MacroError;
use crate::component::{Component, Descriptor};
use crate::element::ElementId;
use crate::error::Result;
use crate::location::Location;
use crate::project::Project;

/// A declared macro parameter.
#[derive(Debug, Clone)]
pub struct MacroAttribute {
  pub name: String,
  pub default: Option<String>,
  pub description: Option<String>,
  /// Whether the caller's value is property-expanded when the instance is bound.
  pub double_expanding: bool,
}

impl Default for MacroAttribute {
  fn default() -> Self {
    Self {
      name: String::new(),
      default: None,
      description: None,
      double_expanding: true,
    }
  }
}

/// The declared free-text parameter.
#[derive(Debug, Clone, Default)]
pub struct MacroText {
  pub name: String,
  pub optional: bool,
  pub trim: bool,
  pub default: Option<String>,
  pub description: Option<String>,
}

/// A named slot in the macro body that callers fill with nested elements.
#[derive(Debug, Clone, Default)]
pub struct MacroElement {
  pub name: String,
  pub optional: bool,
  pub implicit: bool,
  pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MacroDefinition {
  pub name: String,
  pub attributes: Vec<MacroAttribute>,
  pub text: Option<MacroText>,
  pub elements: IndexMap<String, MacroElement>,
  /// The prototype `sequential` element.
  pub body: ElementId,
  pub backtrace: bool,
  pub description: Option<String>,
  pub location: Location,
}

impl MacroDefinition {
  pub fn attribute(&self, name: &str) -> Option<&MacroAttribute> {
    self.attributes.iter().find(|a| a.name == name)
  }

  pub fn implicit_element(&self) -> Option<&MacroElement> {
    self.elements.values().find(|e| e.implicit)
  }
}

/// Lower-case a parameter name after checking it only uses letters, digits, `.` and `-`.
pub fn canonical_name(name: &str, kind: &'static str) -> Result<String, MacroError> {
  let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '-');
  if !valid {
    return Err(MacroError::InvalidName {
      name: name.to_string(),
      kind,
    });
  }
  Ok(name.to_lowercase())
}

/// The `macrodef` task.
#[derive(Debug)]
pub struct MacroDef {
  name: Option<String>,
  backtrace: bool,
  description: Option<String>,
  attributes: Vec<MacroAttribute>,
  text: Option<MacroText>,
  elements: IndexMap<String, MacroElement>,
  body: Option<ElementId>,
}

impl Default for MacroDef {
  fn default() -> Self {
    Self {
      name: None,
      backtrace: true,
      description: None,
      attributes: Vec::new(),
      text: None,
      elements: IndexMap::new(),
      body: None,
    }
  }
}

impl MacroDef {
  fn add_attribute(&mut self, attribute: MacroAttribute) -> Result<(), MacroError> {
    let name = &attribute.name;
    if self.text.as_ref().is_some_and(|t| &t.name == name) {
      return Err(MacroError::NameUsedByText(name.clone()));
    }
    if self.elements.contains_key(name) {
      return Err(MacroError::NameUsedByElement(name.clone()));
    }
    if self.attributes.iter().any(|a| &a.name == name) {
      return Err(MacroError::DuplicateAttribute(name.clone()));
    }
    self.attributes.push(attribute);
    Ok(())
  }

  fn add_text(&mut self, text: MacroText) -> Result<(), MacroError> {
    if self.text.is_some() {
      return Err(MacroError::DuplicateText);
    }
    if self.attributes.iter().any(|a| a.name == text.name) {
      return Err(MacroError::NameUsedByAttribute(text.name));
    }
    if self.elements.contains_key(&text.name) {
      return Err(MacroError::NameUsedByElement(text.name));
    }
    self.text = Some(text);
    Ok(())
  }

  fn add_element(&mut self, element: MacroElement) -> Result<(), MacroError> {
    if self.elements.contains_key(&element.name) {
      return Err(MacroError::DuplicateSlot(element.name));
    }
    if self.attributes.iter().any(|a| a.name == element.name) {
      return Err(MacroError::NameUsedByAttribute(element.name));
    }
    if self.text.as_ref().is_some_and(|t| t.name == element.name) {
      return Err(MacroError::NameUsedByText(element.name));
    }
    if self.elements.values().any(|e| e.implicit) || (element.implicit && !self.elements.is_empty()) {
      return Err(MacroError::ImplicitNotAlone);
    }
    self.elements.insert(element.name.clone(), element);
    Ok(())
  }

  fn set_body(&mut self, body: ElementId) -> Result<(), MacroError> {
    if self.body.is_some() {
      return Err(MacroError::DuplicateBody);
    }
    self.body = Some(body);
    Ok(())
  }

  pub(crate) fn descriptor() -> Descriptor<MacroDef> {
    Descriptor::<MacroDef>::new()
      .attr_checked("name", |def, value| {
        def.name = Some(canonical_name(value, "macro")?);
        Ok(())
      })
      .flag("backtrace", |def, value| def.backtrace = value)
      .attr("description", |def, value| def.description = Some(value))
      .require("name")
      .nested("attribute", attribute_descriptor(), |def, attribute| {
        Ok(def.add_attribute(attribute)?)
      })
      .nested("text", text_descriptor(), |def, text| Ok(def.add_text(text)?))
      .nested("element", element_descriptor(), |def, element| Ok(def.add_element(element)?))
      .raw_nested("sequential", |def, body| Ok(def.set_body(body)?))
      .finish(|def, _| {
        if def.body.is_none() {
          return Err(MacroError::MissingBody.into());
        }
        Ok(())
      })
  }
}

fn attribute_descriptor() -> Descriptor<MacroAttribute> {
  Descriptor::<MacroAttribute>::new()
    .attr_checked("name", |a, value| {
      a.name = canonical_name(value, "attribute")?;
      Ok(())
    })
    .attr("default", |a, value| a.default = Some(value))
    .attr("description", |a, value| a.description = Some(value))
    .flag("doubleexpanding", |a, value| a.double_expanding = value)
    .require("name")
}

fn text_descriptor() -> Descriptor<MacroText> {
  Descriptor::<MacroText>::new()
    .attr_checked("name", |t, value| {
      t.name = canonical_name(value, "text")?;
      Ok(())
    })
    .flag("optional", |t, value| t.optional = value)
    .flag("trim", |t, value| t.trim = value)
    .attr("default", |t, value| t.default = Some(value))
    .attr("description", |t, value| t.description = Some(value))
    .require("name")
}

fn element_descriptor() -> Descriptor<MacroElement> {
  Descriptor::<MacroElement>::new()
    .attr_checked("name", |e, value| {
      e.name = canonical_name(value, "element")?;
      Ok(())
    })
    .flag("optional", |e, value| e.optional = value)
    .flag("implicit", |e, value| e.implicit = value)
    .attr("description", |e, value| e.description = Some(value))
    .require("name")
}

impl Component for MacroDef {
  fn execute(&self, project: &mut Project, element: ElementId) -> Result<()> {
    let (Some(name), Some(body)) = (self.name.clone(), self.body) else {
      return Err(MacroError::MissingBody.into());
    };

    debug!(name = %name, attributes = self.attributes.len(), slots = self.elements.len(), "creating macro");
    let definition = MacroDefinition {
      name,
      attributes: self.attributes.clone(),
      text: self.text.clone(),
      elements: self.elements.clone(),
      body,
      backtrace: self.backtrace,
      description: self.description.clone(),
      location: project.tree()[element].location.clone(),
    };
    project.registry_mut().register_macro(definition);
    Ok(())
  }

  fn describe(&self) -> String {
    self.name.clone().unwrap_or_default()
  }
}
