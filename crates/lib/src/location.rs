//! Source locations for diagnostics.
//!
//! Every parsed element remembers where its start tag appeared so that errors
//! raised much later, while binding or executing, can still point at the line
//! that caused them.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A position in a build file. Lines and columns are 1-based; zero means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
  pub file: Option<Arc<Path>>,
  pub line: u32,
  pub column: u32,
}

impl Location {
  pub const UNKNOWN: Location = Location {
    file: None,
    line: 0,
    column: 0,
  };

  pub fn new(file: Option<Arc<Path>>, line: u32, column: u32) -> Self {
    Self { file, line, column }
  }

  pub fn is_known(&self) -> bool {
    self.file.is_some() || self.line > 0
  }
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (&self.file, self.line) {
      (Some(file), 0) => write!(f, "{}", file.display()),
      (Some(file), line) => write!(f, "{}:{}:{}", file.display(), line, self.column),
      (None, 0) => Ok(()),
      (None, line) => write!(f, "line {}:{}", line, self.column),
    }
  }
}

/// Byte offset to line/column translation for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
  line_starts: Vec<usize>,
  file: Option<Arc<Path>>,
}

impl LineIndex {
  pub fn new(source: &str, file: Option<Arc<Path>>) -> Self {
    let line_starts = std::iter::once(0)
      .chain(source.match_indices('\n').map(|(idx, _)| idx + 1))
      .collect();
    Self { line_starts, file }
  }

  pub fn location(&self, offset: usize) -> Location {
    // partition_point gives the number of line starts <= offset, which is the 1-based line
    let line = self.line_starts.partition_point(|&start| start <= offset).max(1);
    let column = offset - self.line_starts[line - 1] + 1;
    Location::new(self.file.clone(), line as u32, column as u32)
  }
}
