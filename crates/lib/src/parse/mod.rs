//! Build file parsing.
//!
//! The XML document is read as a stream of events and turned into the
//! element tree through a stack of content handlers, see [`handler`].
//! Nothing is bound while parsing: attribute values and text are stored as
//! written.

mod handler;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info};

use crate::element::ElementId;
use crate::error::{BuildError, ErrorKind, Result};
use crate::location::{LineIndex, Location};
use crate::project::{Project, names};

use handler::{HandlerStack, StartTag};

/// Mutable state shared by the content handlers.
pub(crate) struct ParseContext<'a> {
  pub project: &'a mut Project,
  pub file: Option<Arc<Path>>,
  /// Open generic elements, innermost last.
  pub elements: Vec<ElementId>,
  /// Target being parsed; `None` at project level.
  pub current_target: Option<String>,
  pub seen_project: bool,
}

impl ParseContext<'_> {
  /// Set the project base directory.
  ///
  /// A `basedir` user property wins over the attribute. A relative
  /// attribute is resolved against the build file's directory. Without an
  /// attribute the build file's directory is used; without a file the base
  /// directory is left alone.
  fn resolve_base_dir(&mut self, attribute: Option<&str>) {
    let file_dir = self
      .file
      .as_deref()
      .and_then(Path::parent)
      .map(|dir| if dir.as_os_str().is_empty() { Path::new(".") } else { dir });

    let dir = if self.project.properties().is_user(names::BASEDIR) {
      self.project.property(names::BASEDIR).map(PathBuf::from)
    } else {
      match (attribute, file_dir) {
        (Some(attr), Some(file_dir)) => Some(file_dir.join(attr)),
        (Some(attr), None) => Some(PathBuf::from(attr)),
        (None, Some(file_dir)) => Some(file_dir.to_path_buf()),
        (None, None) => None,
      }
    };

    if let Some(dir) = dir {
      let dir = dunce::canonicalize(&dir).unwrap_or(dir);
      self.project.set_base_dir(dir);
    }
  }
}

/// Parse a build file held in memory into `project`.
///
/// `file` is only used for locations and base directory resolution.
pub fn parse_str(project: &mut Project, source: &str, file: Option<&Path>) -> Result<()> {
  let file: Option<Arc<Path>> = file.map(Arc::from);
  let index = LineIndex::new(source, file.clone());
  let mut ctx = ParseContext {
    project,
    file,
    elements: Vec::new(),
    current_target: None,
    seen_project: false,
  };
  let mut stack = HandlerStack::default();
  let mut open: Vec<String> = Vec::new();
  let mut reader = Reader::from_str(source);

  loop {
    let location = index.location(reader.buffer_position() as usize);
    let event = match reader.read_event() {
      Ok(event) => event,
      Err(err) => return Err(xml_error(err, index.location(reader.buffer_position() as usize))),
    };

    match event {
      Event::Start(start) => {
        let location = tag_location(&index, source, reader.buffer_position() as usize);
        let tag = start_tag(&start, location)?;
        open.push(tag.name.clone());
        open_element(&mut ctx, &mut stack, tag)?;
      }
      Event::Empty(start) => {
        let location = tag_location(&index, source, reader.buffer_position() as usize);
        let tag = start_tag(&start, location)?;
        open_element(&mut ctx, &mut stack, tag)?;
        close_element(&mut ctx, &mut stack)?;
      }
      Event::End(_) => {
        open.pop();
        close_element(&mut ctx, &mut stack)?;
      }
      Event::Text(text) => {
        let text = text.unescape().map_err(|err| xml_error(err, location.clone()))?;
        stack.current().characters(&mut ctx, &text, &location)?;
      }
      Event::CData(data) => {
        let data = data.into_inner();
        let text = String::from_utf8_lossy(&data);
        stack.current().characters(&mut ctx, &text, &location)?;
      }
      Event::Eof => break,
      // declarations, comments, processing instructions and doctypes carry nothing
      _ => {}
    }
  }

  let end = index.location(source.len());
  if let Some(tag) = open.last() {
    return Err(BuildError::at(
      ErrorKind::Xml(format!("unexpected end of document inside <{tag}>")),
      end,
    ));
  }
  if !ctx.seen_project {
    return Err(BuildError::at(ErrorKind::Xml("no project element found".to_string()), end));
  }

  debug!(
    targets = ctx.project.targets().len(),
    elements = ctx.project.tree().len(),
    "parsed build file"
  );
  Ok(())
}

/// Location of the `<` opening the tag that ends just before `end`.
///
/// Attribute values cannot contain a raw `<`, so the last one before the end
/// of the tag is its start.
fn tag_location(index: &LineIndex, source: &str, end: usize) -> Location {
  let end = end.min(source.len());
  index.location(source[..end].rfind('<').unwrap_or(0))
}

fn open_element(ctx: &mut ParseContext<'_>, stack: &mut HandlerStack, tag: StartTag) -> Result<()> {
  let handler = stack.current().child(ctx, &tag)?;
  handler.start(ctx, tag)?;
  stack.push(handler);
  Ok(())
}

fn close_element(ctx: &mut ParseContext<'_>, stack: &mut HandlerStack) -> Result<()> {
  match stack.pop() {
    Some(handler) => handler.end(ctx),
    None => Ok(()),
  }
}

fn start_tag(start: &BytesStart<'_>, location: Location) -> Result<StartTag> {
  let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
  let mut attributes = Vec::new();
  for attribute in start.attributes() {
    let attribute = attribute.map_err(|err| xml_error(err, location.clone()))?;
    let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
    let value = attribute
      .unescape_value()
      .map_err(|err| xml_error(err, location.clone()))?
      .into_owned();
    attributes.push((key, value));
  }
  Ok(StartTag {
    name,
    attributes,
    location,
  })
}

fn xml_error(err: impl std::fmt::Display, location: Location) -> BuildError {
  BuildError::at(ErrorKind::Xml(err.to_string()), location)
}

/// Read and parse a build file.
///
/// The file path is canonicalized and recorded as the project's build file.
pub fn parse_file(project: &mut Project, path: &Path) -> Result<()> {
  let source = std::fs::read_to_string(path).map_err(|source| {
    BuildError::new(ErrorKind::Io {
      path: path.to_path_buf(),
      source,
    })
  })?;
  let path = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
  project.set_build_file(&path);

  info!(file = %path.display(), "loading build file");
  parse_str(project, &source, Some(&path))
}

/// Parse a build file held in memory and run its top-level elements.
pub fn load_str(project: &mut Project, source: &str) -> Result<()> {
  parse_str(project, source, None)?;
  project.run_implicit_target()
}

/// Parse a build file and run its top-level elements.
pub fn load_file(project: &mut Project, path: &Path) -> Result<()> {
  parse_file(project, path)?;
  project.run_implicit_target()
}
