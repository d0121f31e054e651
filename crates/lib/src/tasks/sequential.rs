use crate::component::{Component, Descriptor};
use crate::element::ElementId;
use crate::error::Result;
use crate::project::Project;

/// Runs its nested elements in order. Children are bound just before they run.
#[derive(Debug, Default)]
pub struct Sequential {
  tasks: Vec<ElementId>,
}

impl Sequential {
  pub(crate) fn descriptor() -> Descriptor<Sequential> {
    Descriptor::<Sequential>::new().tasks(|seq, task| seq.tasks.push(task))
  }
}

impl Component for Sequential {
  fn execute(&self, project: &mut Project, _element: ElementId) -> Result<()> {
    for &task in &self.tasks {
      project.perform(task)?;
    }
    Ok(())
  }
}
