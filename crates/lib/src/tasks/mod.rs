//! Built-in tasks and data types.
//!
//! Each component describes its attributes and children with a
//! [`Descriptor`](crate::component::Descriptor) and is registered under its
//! tag name by [`register_builtins`].

mod antcall;
mod description;
mod echo;
mod fail;
mod path;
mod property;
mod sequential;

pub use antcall::{AntCall, Param};
pub use description::Description;
pub use echo::Echo;
pub use fail::Fail;
pub use path::{SearchPath, split_path};
pub use property::{PropertyTask, parse_properties};
pub use sequential::Sequential;

use crate::component::ComponentRegistry;
use crate::macros::MacroDef;

/// Register every built-in tag.
pub fn register_builtins(registry: &mut ComponentRegistry) {
  registry.register("antcall", AntCall::descriptor());
  registry.register("description", Description::descriptor());
  registry.register("echo", Echo::descriptor());
  registry.register("fail", Fail::descriptor());
  registry.register("macrodef", MacroDef::descriptor());
  registry.register("path", SearchPath::descriptor());
  registry.register("property", PropertyTask::descriptor());
  registry.register("sequential", Sequential::descriptor());
}
