//! Macro templates.
//!
//! A `macrodef` stores a prototype `sequential` body together with declared
//! attributes, an optional text parameter and named element slots. Each use
//! of the macro copies the body into fresh elements, substitutes `@{name}`
//! tokens and splices the caller's nested elements into the slots, then runs
//! the copy.

mod definition;
mod instance;
mod subst;

use thiserror::Error;

pub use definition::{MacroAttribute, MacroDef, MacroDefinition, MacroElement, MacroText, canonical_name};
pub use instance::MacroInstance;
pub use subst::macro_subs;

/// Errors raised while declaring or expanding a macro.
#[derive(Debug, Error)]
pub enum MacroError {
  #[error("Illegal name [{name}] for {kind}")]
  InvalidName { name: String, kind: &'static str },

  #[error("the name \"{0}\" has already been used in another attribute element")]
  DuplicateAttribute(String),

  #[error("the name \"{0}\" has already been used by the text element")]
  NameUsedByText(String),

  #[error("the name \"{0}\" is already used as an attribute")]
  NameUsedByAttribute(String),

  #[error("the name \"{0}\" is already used as a nested element")]
  NameUsedByElement(String),

  #[error("the element {0} has already been specified")]
  DuplicateSlot(String),

  #[error("Only one nested text element allowed")]
  DuplicateText,

  #[error("Only one element allowed when using implicit elements")]
  ImplicitNotAlone,

  #[error("Missing sequential element")]
  MissingBody,

  #[error("Only one sequential element allowed")]
  DuplicateBody,

  #[error("required attribute {0} not set")]
  MissingAttribute(String),

  #[error("required text missing")]
  MissingText,

  #[error("Unknown attribute{} [{}]", if .0.len() > 1 { "s" } else { "" }, .0.join(", "))]
  UnknownAttributes(Vec<String>),

  #[error("The \"{0}\" macro does not support nested text data.")]
  UnsupportedText(String),

  #[error("unsupported element {0}")]
  UnsupportedElement(String),

  #[error("Element {0} already present")]
  DuplicateElement(String),

  #[error("Missing nested elements for implicit element {0}")]
  MissingImplicit(String),

  #[error("Required nested element {0} missing")]
  MissingElement(String),
}
