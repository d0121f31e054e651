use antler_lib::MessageLevel;
use serial_test::serial;
use tempfile::TempDir;

use super::common::{load, write_file};

#[test]
fn first_definition_wins() {
  let (project, _) = load(
    r#"<project>
      <property name="a" value="1"/>
      <property name="a" value="2"/>
      <property name="b" value="${a}${a}"/>
    </project>"#,
  );
  assert_eq!(project.property("a"), Some("1"));
  assert_eq!(project.property("b"), Some("11"));
}

#[test]
fn user_properties_cannot_be_overridden() {
  let mut project = antler_lib::Project::new();
  project.properties_mut().set_user("mode", "release");
  antler_lib::parse::load_str(&mut project, r#"<project><property name="mode" value="debug"/></project>"#).unwrap();
  assert_eq!(project.property("mode"), Some("release"));
}

#[test]
fn undefined_references_are_kept_literally() {
  let (project, listener) = load(r#"<project><echo message="${nope} $${escaped} $x"/></project>"#);
  assert_eq!(listener.messages(MessageLevel::Info), vec!["${nope} ${escaped} $x"]);
  assert_eq!(project.property("nope"), None);
}

#[test]
fn properties_load_from_file() {
  let temp = TempDir::new().unwrap();
  write_file(
    temp.path(),
    "conf/app.properties",
    "# settings\nname = antler\ngreeting=hello ${app.name}\nlong = one \\\n  two\n",
  );

  let source = format!(
    r#"<project basedir="{}">
      <property file="conf/app.properties" prefix="app"/>
      <property file="conf/missing.properties"/>
    </project>"#,
    temp.path().display()
  );
  let (project, listener) = load(&source);

  assert_eq!(project.property("app.name"), Some("antler"));
  assert_eq!(project.property("app.greeting"), Some("hello antler"));
  assert_eq!(project.property("app.long"), Some("one two"));
  let verbose = listener.messages(MessageLevel::Verbose);
  assert!(verbose.iter().any(|m| m.starts_with("Unable to find property file:")));
}

#[test]
#[serial]
fn environment_is_exposed_with_prefix() {
  temp_env::with_var("ANTLER_TEST_GREETING", Some("hi"), || {
    let (project, _) = load(r#"<project><property environment="env"/></project>"#);
    assert_eq!(project.property("env.ANTLER_TEST_GREETING"), Some("hi"));
  });
}

#[test]
#[serial]
fn environment_does_not_override_existing() {
  temp_env::with_var("ANTLER_TEST_GREETING", Some("from env"), || {
    let (project, _) = load(
      r#"<project>
        <property name="env.ANTLER_TEST_GREETING" value="from file"/>
        <property environment="env"/>
      </project>"#,
    );
    assert_eq!(project.property("env.ANTLER_TEST_GREETING"), Some("from file"));
  });
}
