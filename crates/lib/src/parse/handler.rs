//! Content handlers: one per nesting context of a build file.
//!
//! The parser keeps a stack of handlers. When a tag opens, the handler on top
//! of the stack picks the handler for the child, which then initializes the
//! new node and is pushed. Below the project and target levels every tag is
//! handled by [`ElementHandler`].

use tracing::debug;

use crate::error::{BuildError, ErrorKind, Result};
use crate::location::Location;
use crate::project::Reference;
use crate::target::{Target, parse_depends};

use super::ParseContext;

/// One parsed start tag.
#[derive(Debug)]
pub(crate) struct StartTag {
  pub name: String,
  pub attributes: Vec<(String, String)>,
  pub location: Location,
}

pub(crate) trait ContentHandler {
  /// Handler for a child tag opened inside this handler's node.
  fn child(&self, _ctx: &ParseContext<'_>, tag: &StartTag) -> Result<&'static dyn ContentHandler> {
    Err(unexpected_element(tag))
  }

  fn start(&self, ctx: &mut ParseContext<'_>, tag: StartTag) -> Result<()>;

  fn end(&self, _ctx: &mut ParseContext<'_>) -> Result<()> {
    Ok(())
  }

  /// Character data; only whitespace is accepted by default.
  fn characters(&self, _ctx: &mut ParseContext<'_>, text: &str, location: &Location) -> Result<()> {
    if text.trim().is_empty() {
      Ok(())
    } else {
      Err(BuildError::at(
        ErrorKind::UnexpectedText(text.trim().to_string()),
        location.clone(),
      ))
    }
  }
}

fn unexpected_element(tag: &StartTag) -> BuildError {
  BuildError::at(ErrorKind::UnexpectedElement(tag.name.clone()), tag.location.clone())
}

fn unexpected_attribute(name: &str, location: &Location) -> BuildError {
  BuildError::at(ErrorKind::UnexpectedAttribute(name.to_string()), location.clone())
}

/// Document level: accepts exactly one `project`.
pub(crate) struct RootHandler;

impl ContentHandler for RootHandler {
  fn child(&self, ctx: &ParseContext<'_>, tag: &StartTag) -> Result<&'static dyn ContentHandler> {
    if tag.name == "project" && !ctx.seen_project {
      Ok(&ProjectHandler)
    } else {
      Err(unexpected_element(tag))
    }
  }

  fn start(&self, _ctx: &mut ParseContext<'_>, tag: StartTag) -> Result<()> {
    Err(unexpected_element(&tag))
  }
}

pub(crate) struct ProjectHandler;

impl ContentHandler for ProjectHandler {
  fn child(&self, _ctx: &ParseContext<'_>, tag: &StartTag) -> Result<&'static dyn ContentHandler> {
    if tag.name == "target" {
      Ok(&TargetHandler)
    } else {
      Ok(&ElementHandler)
    }
  }

  fn start(&self, ctx: &mut ParseContext<'_>, tag: StartTag) -> Result<()> {
    ctx.seen_project = true;
    let mut base_dir = None;

    for (name, value) in &tag.attributes {
      match name.as_str() {
        "name" => ctx.project.set_name(value),
        "default" => ctx.project.set_default_target(value),
        "basedir" => base_dir = Some(value.clone()),
        "id" => ctx.project.add_reference(value, Reference::Project),
        _ if name == "xmlns" || name.starts_with("xmlns:") => {}
        _ => return Err(unexpected_attribute(name, &tag.location)),
      }
    }

    ctx.resolve_base_dir(base_dir.as_deref());
    debug!(
      name = ctx.project.name().unwrap_or_default(),
      basedir = %ctx.project.base_dir().display(),
      "parsing project"
    );
    Ok(())
  }
}

pub(crate) struct TargetHandler;

impl ContentHandler for TargetHandler {
  fn child(&self, _ctx: &ParseContext<'_>, _tag: &StartTag) -> Result<&'static dyn ContentHandler> {
    Ok(&ElementHandler)
  }

  fn start(&self, ctx: &mut ParseContext<'_>, tag: StartTag) -> Result<()> {
    let mut target = Target::new(String::new(), tag.location.clone());
    let mut name = None;
    let mut depends = None;
    let mut id = None;

    for (attribute, value) in tag.attributes {
      match attribute.as_str() {
        "name" => name = Some(value),
        "depends" => depends = Some(value),
        "if" => target.if_cond = Some(value),
        "unless" => target.unless_cond = Some(value),
        "description" => target.description = Some(value),
        "id" => id = Some(value),
        _ => return Err(unexpected_attribute(&attribute, &tag.location)),
      }
    }

    let Some(name) = name else {
      return Err(BuildError::at(
        ErrorKind::MissingAttribute {
          element: "target".to_string(),
          attribute: "name".to_string(),
        },
        tag.location,
      ));
    };
    if name.is_empty() {
      return Err(BuildError::at(ErrorKind::EmptyTargetName, tag.location));
    }
    if let Some(depends) = depends {
      target.depends = parse_depends(&name, &depends).map_err(|e| e.located(&tag.location))?;
    }
    if let Some(id) = id {
      ctx.project.add_reference(&id, Reference::Target(name.clone()));
    }

    target.name = name.clone();
    ctx.project.add_target(target)?;
    ctx.current_target = Some(name);
    Ok(())
  }

  fn end(&self, ctx: &mut ParseContext<'_>) -> Result<()> {
    ctx.current_target = None;
    Ok(())
  }
}

/// Any task or data type element.
pub(crate) struct ElementHandler;

impl ContentHandler for ElementHandler {
  fn child(&self, _ctx: &ParseContext<'_>, _tag: &StartTag) -> Result<&'static dyn ContentHandler> {
    Ok(&ElementHandler)
  }

  fn start(&self, ctx: &mut ParseContext<'_>, tag: StartTag) -> Result<()> {
    let tree = ctx.project.tree_mut();
    let element = tree.create(tag.name.to_lowercase(), tag.location.clone());
    for (name, value) in tag.attributes {
      if !tree[element].wrapper.set_attribute(name.to_lowercase(), value) {
        return Err(unexpected_attribute(&name, &tag.location));
      }
    }

    match ctx.elements.last() {
      Some(&parent) => ctx.project.tree_mut().add_child(parent, element),
      None => ctx.project.add_to_target(ctx.current_target.as_deref(), element),
    }
    if let Some(id) = ctx.project.tree()[element].wrapper.id().map(str::to_string) {
      ctx.project.add_reference(&id, Reference::Element(element));
    }

    ctx.elements.push(element);
    Ok(())
  }

  fn end(&self, ctx: &mut ParseContext<'_>) -> Result<()> {
    ctx.elements.pop();
    Ok(())
  }

  fn characters(&self, ctx: &mut ParseContext<'_>, text: &str, _location: &Location) -> Result<()> {
    if let Some(&element) = ctx.elements.last() {
      ctx.project.tree_mut()[element].wrapper.add_text(text);
    }
    Ok(())
  }
}

/// The handlers of the currently open nodes, innermost last.
#[derive(Default)]
pub(crate) struct HandlerStack {
  handlers: Vec<&'static dyn ContentHandler>,
}

impl HandlerStack {
  pub fn current(&self) -> &'static dyn ContentHandler {
    self.handlers.last().copied().unwrap_or(&RootHandler)
  }

  pub fn push(&mut self, handler: &'static dyn ContentHandler) {
    self.handlers.push(handler);
  }

  pub fn pop(&mut self) -> Option<&'static dyn ContentHandler> {
    self.handlers.pop()
  }
}
