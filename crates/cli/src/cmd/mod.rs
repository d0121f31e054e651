mod run;
mod targets;

pub use run::cmd_run;
pub use targets::cmd_targets;
