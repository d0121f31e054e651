//! Macro instances: one use of a macro.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use super::{MacroDefinition, MacroError, macro_subs};
use crate::component::Component;
use crate::element::ElementId;
use crate::error::Result;
use crate::location::Location;
use crate::project::Project;

/// The component an element whose tag names a macro binds to.
///
/// Holds the caller's attributes, text and nested elements. Nothing is
/// checked against the definition until the instance runs.
#[derive(Debug)]
pub struct MacroInstance {
  definition: Rc<MacroDefinition>,
  tag: String,
  attributes: IndexMap<String, String>,
  text: Option<String>,
  description: Option<String>,
  children: Vec<ElementId>,
}

impl MacroInstance {
  pub fn configure(definition: Rc<MacroDefinition>, project: &mut Project, element: ElementId) -> Result<Self> {
    let node = &project.tree()[element];
    let tag = node.tag.clone();
    let location = node.location.clone();
    let raw_attributes = node.wrapper.attributes.clone();
    let text = node.wrapper.text.clone();
    let children = node.children.clone();

    let mut attributes = IndexMap::new();
    let mut description = None;
    for (name, raw) in &raw_attributes {
      let name = name.to_lowercase();
      let expand = definition.attribute(&name).is_none_or(|a| a.double_expanding);
      let value = if expand {
        project.expand(raw).map_err(|e| e.located(&location))?
      } else {
        raw.clone()
      };

      if name == "description" {
        description = Some(value);
      } else {
        attributes.insert(name, value);
      }
    }

    let text = project.expand(&text).map_err(|e| e.located(&location))?;

    Ok(Self {
      definition,
      tag,
      attributes,
      text: (!text.is_empty()).then_some(text),
      description,
      children,
    })
  }

  pub fn definition(&self) -> &MacroDefinition {
    &self.definition
  }

  /// Caller elements keyed by the slot they fill. Empty when the macro has an implicit slot.
  fn present_elements(&self, project: &Project) -> Result<IndexMap<String, ElementId>, MacroError> {
    let mut present = IndexMap::new();
    if self.definition.implicit_element().is_some() {
      return Ok(present);
    }

    for &child in &self.children {
      let name = project.tree()[child].tag.to_lowercase();
      if !self.definition.elements.contains_key(&name) {
        return Err(MacroError::UnsupportedElement(name));
      }
      if present.contains_key(&name) {
        return Err(MacroError::DuplicateElement(name));
      }
      present.insert(name, child);
    }

    Ok(present)
  }

  /// Values for `@{name}` substitution: declared attributes, then the text parameter.
  fn local_values(&self) -> Result<HashMap<String, String>, MacroError> {
    let mut locals = HashMap::new();
    let mut unknown: Vec<String> = self.attributes.keys().filter(|k| *k != "id").cloned().collect();

    for attribute in &self.definition.attributes {
      let mut value = self.attributes.get(&attribute.name).cloned();
      if value.is_none() && attribute.name == "description" {
        value = self.description.clone();
      }
      if value.is_none() {
        // defaults may refer to attributes declared before them
        value = attribute.default.as_deref().map(|d| macro_subs(d, &locals));
      }
      let Some(value) = value else {
        return Err(MacroError::MissingAttribute(attribute.name.clone()));
      };

      locals.insert(attribute.name.clone(), value);
      unknown.retain(|name| name != &attribute.name);
    }

    match &self.definition.text {
      Some(declared) => {
        let mut text = match &self.text {
          Some(text) => text.clone(),
          None if !declared.optional && declared.default.is_none() => return Err(MacroError::MissingText),
          None => declared.default.clone().unwrap_or_default(),
        };
        if declared.trim {
          text = text.trim().to_string();
        }
        locals.insert(declared.name.clone(), text);
      }
      None => {
        if self.text.as_deref().is_some_and(|t| !t.trim().is_empty()) {
          return Err(MacroError::UnsupportedText(self.tag.clone()));
        }
      }
    }

    if !unknown.is_empty() {
      return Err(MacroError::UnknownAttributes(unknown));
    }

    Ok(locals)
  }
}

impl Component for MacroInstance {
  fn execute(&self, project: &mut Project, element: ElementId) -> Result<()> {
    let location = project.tree()[element].location.clone();
    let present = self.present_elements(project)?;
    let locals = self.local_values()?;

    debug!(name = %self.definition.name, location = %location, "expanding macro");
    let expansion = Expansion {
      instance: self,
      present: &present,
      locals: &locals,
      call_site: &location,
    };
    let mark = project.tree().len();
    let body = expansion.copy(project, self.definition.body, false)?;

    let backtrace = self.definition.backtrace;
    let result = project.perform(body).map_err(|err| {
      if backtrace {
        err.nested_at(&location)
      } else {
        err.relocated(&location)
      }
    });

    if expansion_is_disposable(project, mark) {
      project.tree_mut().truncate(mark);
    }
    result
  }

  fn describe(&self) -> String {
    self.definition.name.clone()
  }
}

/// Whether the elements copied since `mark` can be dropped after the use.
///
/// Copies stay alive while something can still reach them: an `id` on a
/// copied element, or a macro defined inside the copied body.
fn expansion_is_disposable(project: &Project, mark: usize) -> bool {
  let tree = project.tree();
  let has_id = (mark..tree.len()).any(|index| tree[ElementId::from_index(index)].wrapper.id().is_some());
  let defines_macro = project.registry().macro_bodies().any(|body| body.index() >= mark);
  !has_id && !defines_macro
}

/// State for copying one macro body.
struct Expansion<'a> {
  instance: &'a MacroInstance,
  present: &'a IndexMap<String, ElementId>,
  locals: &'a HashMap<String, String>,
  call_site: &'a Location,
}

impl Expansion<'_> {
  /// Copy `source` into a fresh element.
  ///
  /// `nested` is set inside caller-supplied content, where slot names are
  /// not matched.
  fn copy(&self, project: &mut Project, source: ElementId, nested: bool) -> Result<ElementId> {
    let node = &project.tree()[source];
    let tag = node.tag.clone();
    let location = if self.instance.definition.backtrace {
      node.location.clone()
    } else {
      self.call_site.clone()
    };
    let attributes = node.wrapper.attributes.clone();
    let text = node.wrapper.text.clone();
    let children = node.children.clone();

    let copy = project.tree_mut().create(tag, location);
    {
      let wrapper = &mut project.tree_mut()[copy].wrapper;
      for (name, value) in &attributes {
        wrapper.attributes.insert(name.clone(), macro_subs(value, self.locals));
      }
      wrapper.add_text(&macro_subs(&text, self.locals));
    }

    for child in children {
      let child_tag = project.tree()[child].tag.to_lowercase();
      let slot = if nested {
        None
      } else {
        self.instance.definition.elements.get(&child_tag)
      };

      match slot {
        None => {
          let copied = self.copy(project, child, nested)?;
          project.tree_mut().add_child(copy, copied);
        }
        Some(slot) if slot.implicit => {
          if self.instance.children.is_empty() && !slot.optional {
            return Err(MacroError::MissingImplicit(slot.name.clone()).into());
          }
          for &supplied in &self.instance.children {
            let copied = self.copy(project, supplied, true)?;
            project.tree_mut().add_child(copy, copied);
          }
        }
        Some(slot) => {
          let Some(&supplied) = self.present.get(&child_tag) else {
            if !slot.optional {
              return Err(MacroError::MissingElement(slot.name.clone()).into());
            }
            continue;
          };

          let supplied_text = project.tree()[supplied].wrapper.text.clone();
          if !supplied_text.is_empty() {
            let text = macro_subs(&supplied_text, self.locals);
            project.tree_mut()[copy].wrapper.add_text(&text);
          }
          for grandchild in project.tree()[supplied].children.clone() {
            let copied = self.copy(project, grandchild, true)?;
            project.tree_mut().add_child(copy, copied);
          }
        }
      }
    }

    Ok(copy)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::{BuildError, ErrorKind};
  use crate::listener::{MessageLevel, RecordingListener};
  use crate::parse::load_str;

  fn run(source: &str, target: &str) -> (Result<()>, RecordingListener) {
    let listener = RecordingListener::new();
    let mut project = Project::new();
    project.add_listener(Rc::new(listener.clone()));
    load_str(&mut project, source).unwrap();
    let result = project.execute_targets(&[target.to_string()]);
    (result, listener)
  }

  fn innermost(err: &BuildError) -> &ErrorKind {
    match err.kind() {
      ErrorKind::Nested(inner) => innermost(inner),
      kind => kind,
    }
  }

  fn macro_error(result: Result<()>) -> String {
    let err = result.unwrap_err();
    match innermost(&err) {
      ErrorKind::Macro(inner) => inner.to_string(),
      other => panic!("expected macro error, got {other}"),
    }
  }

  // =============================================================================
  // Attributes and text
  // =============================================================================

  #[test]
  fn substitutes_attributes_and_defaults() {
    let (result, listener) = run(
      r#"<project>
        <macrodef name="greet">
          <attribute name="who"/>
          <attribute name="greeting" default="hello @{who}"/>
          <sequential><echo message="@{greeting}!"/></sequential>
        </macrodef>
        <target name="t"><greet who="world"/><greet who="you" greeting="bye"/></target>
      </project>"#,
      "t",
    );
    result.unwrap();
    assert_eq!(listener.messages(MessageLevel::Info), vec!["hello world!", "bye!"]);
  }

  #[test]
  fn missing_required_attribute() {
    let (result, _) = run(
      r#"<project>
        <macrodef name="m"><attribute name="dest"/><sequential/></macrodef>
        <target name="t"><m/></target>
      </project>"#,
      "t",
    );
    assert_eq!(macro_error(result), "required attribute dest not set");
  }

  #[test]
  fn unknown_caller_attributes() {
    let (result, _) = run(
      r#"<project>
        <macrodef name="m"><sequential/></macrodef>
        <target name="t"><m id="ok" colour="red" size="1"/></target>
      </project>"#,
      "t",
    );
    assert_eq!(macro_error(result), "Unknown attributes [colour, size]");
  }

  #[test]
  fn description_falls_back_to_instance_description() {
    let (result, listener) = run(
      r#"<project>
        <macrodef name="m">
          <attribute name="description"/>
          <sequential><echo message="[@{description}]"/></sequential>
        </macrodef>
        <target name="t"><m description="from caller"/></target>
      </project>"#,
      "t",
    );
    result.unwrap();
    assert_eq!(listener.messages(MessageLevel::Info), vec!["[from caller]"]);
  }

  #[test]
  fn text_parameter_with_trim_and_default() {
    let (result, listener) = run(
      r#"<project>
        <macrodef name="say">
          <text name="body" trim="true" default="nothing"/>
          <sequential><echo message="(@{body})"/></sequential>
        </macrodef>
        <target name="t"><say>  padded  </say><say/></target>
      </project>"#,
      "t",
    );
    result.unwrap();
    assert_eq!(listener.messages(MessageLevel::Info), vec!["(padded)", "(nothing)"]);
  }

  #[test]
  fn text_without_declaration_is_rejected() {
    let (result, _) = run(
      r#"<project>
        <macrodef name="m"><sequential/></macrodef>
        <target name="t"><m>words</m></target>
      </project>"#,
      "t",
    );
    assert_eq!(
      macro_error(result),
      "The \"m\" macro does not support nested text data."
    );
  }

  #[test]
  fn double_expanding_can_be_disabled() {
    let (result, listener) = run(
      r#"<project>
        <property name="p" value="expanded"/>
        <macrodef name="m">
          <attribute name="raw" doubleexpanding="false"/>
          <sequential><echo message="@{raw}"/></sequential>
        </macrodef>
        <target name="t"><m raw="$${p}"/></target>
      </project>"#,
      "t",
    );
    result.unwrap();
    // the caller value stays "$${p}", the body expansion turns it into "${p}"
    assert_eq!(listener.messages(MessageLevel::Info), vec!["${p}"]);
  }

  #[test]
  fn caller_text_is_expanded_like_attributes() {
    let (result, listener) = run(
      r#"<project>
        <property name="p" value="v"/>
        <macrodef name="m">
          <attribute name="a"/>
          <text name="t"/>
          <sequential><echo message="attr=@{a} text=@{t}"/></sequential>
        </macrodef>
        <target name="t"><m a="$${p}">$${p}</m></target>
      </project>"#,
      "t",
    );
    result.unwrap();
    assert_eq!(listener.messages(MessageLevel::Info), vec!["attr=v text=v"]);
  }

  #[test]
  fn trim_applies_to_expanded_text() {
    let (result, listener) = run(
      r#"<project>
        <property name="pad" value="  x  "/>
        <macrodef name="m">
          <text name="t" trim="true"/>
          <sequential><echo message="[@{t}]"/></sequential>
        </macrodef>
        <target name="t"><m>${pad}</m></target>
      </project>"#,
      "t",
    );
    result.unwrap();
    assert_eq!(listener.messages(MessageLevel::Info), vec!["[x]"]);
  }

  // =============================================================================
  // Element slots
  // =============================================================================

  #[test]
  fn implicit_slot_splices_all_children_in_order() {
    let (result, listener) = run(
      r#"<project>
        <macrodef name="twice">
          <element name="tasks" implicit="true"/>
          <sequential><tasks/><echo message="--"/><tasks/></sequential>
        </macrodef>
        <target name="t"><twice><echo message="a"/><echo message="b"/></twice></target>
      </project>"#,
      "t",
    );
    result.unwrap();
    assert_eq!(listener.messages(MessageLevel::Info), vec!["a", "b", "--", "a", "b"]);
  }

  #[test]
  fn named_slots_take_caller_children() {
    let (result, listener) = run(
      r#"<project>
        <macrodef name="wrap">
          <attribute name="tag"/>
          <element name="before" optional="true"/>
          <element name="body"/>
          <sequential><before/><echo message="start @{tag}"/><body/></sequential>
        </macrodef>
        <target name="t">
          <wrap tag="x"><body><echo message="inside @{tag}"/></body></wrap>
        </target>
      </project>"#,
      "t",
    );
    result.unwrap();
    assert_eq!(listener.messages(MessageLevel::Info), vec!["start x", "inside x"]);
  }

  #[test]
  fn slot_errors() {
    let source = |call: &str| {
      format!(
        r#"<project>
          <macrodef name="m"><element name="body"/><sequential><body/></sequential></macrodef>
          <target name="t">{call}</target>
        </project>"#
      )
    };

    let (result, _) = run(&source("<m/>"), "t");
    assert_eq!(macro_error(result), "Required nested element body missing");

    let (result, _) = run(&source("<m><other/></m>"), "t");
    assert_eq!(macro_error(result), "unsupported element other");

    let (result, _) = run(&source("<m><body/><body/></m>"), "t");
    assert_eq!(macro_error(result), "Element body already present");
  }

  #[test]
  fn missing_implicit_children() {
    let (result, _) = run(
      r#"<project>
        <macrodef name="m"><element name="all" implicit="true"/><sequential><all/></sequential></macrodef>
        <target name="t"><m/></target>
      </project>"#,
      "t",
    );
    assert_eq!(
      macro_error(result),
      "Missing nested elements for implicit element all"
    );
  }

  // =============================================================================
  // Locations
  // =============================================================================

  #[test]
  fn backtrace_reports_body_line_and_call_site() {
    let (result, _) = run(
      "<project>\n<macrodef name=\"m\">\n<sequential>\n<fail message=\"inside\"/>\n</sequential>\n</macrodef>\n<target name=\"t\">\n<m/>\n</target>\n</project>",
      "t",
    );
    let err = result.unwrap_err();
    assert_eq!(err.location().line, 8);
    let ErrorKind::Nested(inner) = err.kind() else {
      panic!("expected nested error, got {err}");
    };
    assert_eq!(inner.location().line, 4);
  }

  #[test]
  fn without_backtrace_errors_point_at_call_site() {
    let (result, _) = run(
      "<project>\n<macrodef name=\"m\" backtrace=\"false\">\n<sequential>\n<fail message=\"inside\"/>\n</sequential>\n</macrodef>\n<target name=\"t\">\n<m/>\n</target>\n</project>",
      "t",
    );
    let err = result.unwrap_err();
    assert_eq!(err.location().line, 8);
    assert!(matches!(err.kind(), ErrorKind::Failed { message, .. } if message == "inside"));
  }

  // =============================================================================
  // Arena
  // =============================================================================

  fn tree_growth(source: &str) -> usize {
    let mut project = Project::new();
    load_str(&mut project, source).unwrap();
    let before = project.tree().len();
    project.execute_targets(&["t".to_string()]).unwrap();
    project.tree().len() - before
  }

  #[test]
  fn copies_are_dropped_after_each_use() {
    let growth = tree_growth(
      r#"<project>
        <macrodef name="m">
          <sequential><echo message="one"/><sequential><echo message="two"/></sequential></sequential>
        </macrodef>
        <target name="t"><m/><m/><m/></target>
      </project>"#,
    );
    assert_eq!(growth, 0);
  }

  #[test]
  fn copies_with_ids_are_kept() {
    let growth = tree_growth(
      r#"<project>
        <macrodef name="m">
          <sequential><path id="p" path="a"/></sequential>
        </macrodef>
        <target name="t"><m/></target>
      </project>"#,
    );
    assert_eq!(growth, 2);
  }
}
