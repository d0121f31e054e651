use crate::component::{Component, Descriptor};
use crate::element::ElementId;
use crate::error::Result;
use crate::listener::MessageLevel;
use crate::project::Project;

/// Logs a message through the build listeners.
#[derive(Debug, Default)]
pub struct Echo {
  message: String,
  level: MessageLevel,
}

impl Echo {
  pub(crate) fn descriptor() -> Descriptor<Echo> {
    Descriptor::<Echo>::new()
      .attr("message", |echo, value| echo.message = value)
      .choice("level", MessageLevel::NAMES, |echo, value| {
        echo.level = value.parse().unwrap_or_default()
      })
      .text(|echo, text| echo.message.push_str(&text))
  }
}

impl Component for Echo {
  fn execute(&self, project: &mut Project, _element: ElementId) -> Result<()> {
    project.log(self.level, &self.message);
    Ok(())
  }
}
