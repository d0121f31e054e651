use crate::component::{Component, Descriptor};
use crate::element::ElementId;
use crate::error::Result;
use crate::project::Project;

/// Appends its text to the project description.
#[derive(Debug, Default)]
pub struct Description {
  text: String,
}

impl Description {
  pub(crate) fn descriptor() -> Descriptor<Description> {
    Descriptor::<Description>::new().text(|desc, text| desc.text.push_str(&text))
  }
}

impl Component for Description {
  fn execute(&self, project: &mut Project, _element: ElementId) -> Result<()> {
    project.append_description(&self.text);
    Ok(())
  }

  fn describe(&self) -> String {
    self.text.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse::load_str;

  #[test]
  fn texts_accumulate() {
    let mut project = Project::new();
    load_str(
      &mut project,
      "<project><description>Builds the </description><description>widget.</description></project>",
    )
    .unwrap();
    assert_eq!(project.description(), Some("Builds the widget."));
  }
}
