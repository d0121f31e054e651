use std::rc::Rc;

use antler_lib::execute::ExecutorKind;
use antler_lib::listener::{RecordedEvent, RecordingListener};
use antler_lib::project::names;
use antler_lib::{BuildConfig, ErrorKind, MessageLevel, load_project, run_build};
use tempfile::TempDir;

use super::common::write_file;

const BUILD: &str = r#"<project name="demo" default="package" basedir="..">
  <description>Demo build</description>
  <property file="build.properties"/>
  <property name="out" location="target"/>

  <target name="compile" description="Compile sources">
    <echo message="compiling into ${out}"/>
  </target>

  <target name="package" depends="compile" description="Bundle ${version}">
    <echo message="packaging ${version}"/>
  </target>
</project>
"#;

fn setup() -> (TempDir, BuildConfig) {
  let temp = TempDir::new().unwrap();
  let file = write_file(temp.path(), "build/build.xml", BUILD);
  write_file(temp.path(), "build.properties", "version=1.2\n");
  let config = BuildConfig {
    build_file: file,
    ..Default::default()
  };
  (temp, config)
}

#[test]
fn run_build_executes_default_target() {
  let (temp, config) = setup();
  let listener = RecordingListener::new();

  let project = run_build(&config, vec![Rc::new(listener.clone())]).unwrap();

  let base = dunce::canonicalize(temp.path()).unwrap();
  assert_eq!(project.base_dir(), base);
  assert_eq!(project.property(names::PROJECT_NAME), Some("demo"));
  assert_eq!(listener.targets_started(), vec!["compile", "package"]);
  assert_eq!(
    listener.messages(MessageLevel::Info),
    vec![
      format!("compiling into {}", base.join("target").display()),
      "packaging 1.2".to_string()
    ]
  );

  let events = listener.events();
  assert_eq!(events.first(), Some(&RecordedEvent::BuildStarted));
  assert_eq!(events.last(), Some(&RecordedEvent::BuildFinished { failed: false }));
}

#[test]
fn user_properties_from_config_win() {
  let (_temp, mut config) = setup();
  config.properties = vec![("version".to_string(), "9.9".to_string())];
  config.targets = vec!["package".to_string()];
  config.executor = ExecutorKind::IgnoreDeps;
  let listener = RecordingListener::new();

  run_build(&config, vec![Rc::new(listener.clone())]).unwrap();

  assert_eq!(listener.messages(MessageLevel::Info), vec!["packaging 9.9"]);
}

#[test]
fn load_project_lists_targets_without_running_them() {
  let (_temp, config) = setup();
  let project = load_project(&config).unwrap();

  assert_eq!(project.description().map(str::trim), Some("Demo build"));
  assert_eq!(project.default_target(), Some("package"));
  let summaries = project.target_summaries();
  let listed: Vec<(&str, Option<&str>, bool)> = summaries
    .iter()
    .map(|t| (t.name.as_str(), t.description.as_deref(), t.default))
    .collect();
  assert_eq!(
    listed,
    vec![
      ("compile", Some("Compile sources"), false),
      ("package", Some("Bundle ${version}"), true)
    ]
  );
}

#[test]
fn build_finished_reports_failure() {
  let temp = TempDir::new().unwrap();
  let file = write_file(
    temp.path(),
    "build.xml",
    "<project default=\"t\">\n  <target name=\"t\">\n    <fail message=\"nope\" status=\"4\"/>\n  </target>\n</project>\n",
  );
  let config = BuildConfig {
    build_file: file,
    ..Default::default()
  };
  let listener = RecordingListener::new();

  let err = run_build(&config, vec![Rc::new(listener.clone())]).unwrap_err();

  assert_eq!(err.exit_status(), Some(4));
  assert_eq!(err.location().line, 3);
  assert!(err.location().file.as_deref().is_some_and(|f| f.ends_with("build.xml")));
  assert_eq!(listener.events().last(), Some(&RecordedEvent::BuildFinished { failed: true }));
}

#[test]
fn missing_build_file_is_an_io_error() {
  let temp = TempDir::new().unwrap();
  let config = BuildConfig {
    build_file: temp.path().join("absent.xml"),
    ..Default::default()
  };
  let err = load_project(&config).unwrap_err();
  assert!(matches!(err.kind(), ErrorKind::Io { .. }));
}
