use antler_lib::ErrorKind;
use antler_lib::MessageLevel;
use antler_lib::execute::ExecutorKind;
use proptest::prelude::*;

use super::common::{load, names, run};

const DIAMOND: &str = r#"<project name="diamond">
  <target name="a" depends="b,c"/>
  <target name="b" depends="d"/>
  <target name="c" depends="d"/>
  <target name="d"/>
  <target name="e" depends="c"/>
</project>"#;

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn dependencies_run_first_and_once() {
  let (result, listener) = run(DIAMOND, &["a"]);
  result.unwrap();
  assert_eq!(listener.targets_started(), vec!["d", "b", "c", "a"]);
}

#[test]
fn default_executor_skips_targets_already_run() {
  let (result, listener) = run(DIAMOND, &["b", "e"]);
  result.unwrap();
  assert_eq!(listener.targets_started(), vec!["d", "b", "c", "e"]);
}

#[test]
fn single_check_sorts_the_union() {
  let (mut project, listener) = load(DIAMOND);
  project.set_executor(ExecutorKind::SingleCheck.create());
  project.execute_targets(&names(&["e", "a"])).unwrap();
  assert_eq!(listener.targets_started(), vec!["d", "c", "e", "b", "a"]);
}

#[test]
fn ignore_deps_runs_only_requested() {
  let (mut project, listener) = load(DIAMOND);
  project.set_executor(ExecutorKind::IgnoreDeps.create());
  project.execute_targets(&names(&["a", "d"])).unwrap();
  assert_eq!(listener.targets_started(), vec!["a", "d"]);
}

#[test]
fn later_targets_see_properties_set_by_earlier_ones() {
  let (result, listener) = run(
    r#"<project>
      <target name="use" depends="set"><echo message="${v}"/></target>
      <target name="set"><property name="v" value="late"/></target>
    </project>"#,
    &["use"],
  );
  result.unwrap();
  assert_eq!(listener.messages(MessageLevel::Info), vec!["late"]);
}

#[test]
fn circular_dependency_is_rejected_before_anything_runs() {
  let (result, listener) = run(
    r#"<project>
      <target name="ok"/>
      <target name="x" depends="y"/>
      <target name="y" depends="x"/>
    </project>"#,
    &["ok"],
  );
  let err = result.unwrap_err();
  assert!(matches!(err.kind(), ErrorKind::CircularDependency(_)), "got {err}");
  assert!(listener.targets_started().is_empty());
}

#[test]
fn missing_dependency_names_the_user() {
  let (result, _) = run(r#"<project name="p"><target name="a" depends="ghost"/></project>"#, &["a"]);
  let message = result.unwrap_err().to_string();
  assert!(message.contains("Target \"ghost\" does not exist in the project \"p\""), "{message}");
  assert!(message.contains("It is used from target \"a\""), "{message}");
}

// =============================================================================
// Keep-going
// =============================================================================

const PARTIAL_FAILURE: &str = r#"<project>
  <target name="broken"><fail message="broken failed"/></target>
  <target name="after" depends="broken"><echo message="after ran"/></target>
  <target name="independent"><echo message="independent ran"/></target>
</project>"#;

#[test]
fn failure_stops_the_build() {
  let (result, listener) = run(PARTIAL_FAILURE, &["after", "independent"]);
  assert!(result.unwrap_err().to_string().ends_with("broken failed"));
  assert_eq!(listener.targets_started(), vec!["broken"]);
}

#[test]
fn keep_going_runs_independent_targets() {
  let (mut project, listener) = load(PARTIAL_FAILURE);
  project.set_keep_going(true);
  let err = project
    .execute_targets(&names(&["after", "independent"]))
    .unwrap_err();

  assert!(err.to_string().ends_with("broken failed"));
  assert_eq!(listener.targets_started(), vec!["broken", "independent"]);
  let messages = listener.messages(MessageLevel::Info);
  assert!(messages.contains(&"Cannot execute 'after' - 'broken' failed or was not executed.".to_string()));
  assert!(messages.contains(&"independent ran".to_string()));
  assert!(!messages.contains(&"after ran".to_string()));
}

// =============================================================================
// antcall
// =============================================================================

#[test]
fn antcall_runs_target_with_params_in_isolation() {
  let (result, listener) = run(
    r#"<project>
      <property name="who" value="outer"/>
      <target name="prep"><echo message="prep"/></target>
      <target name="greet" depends="prep">
        <property name="leaked" value="yes"/>
        <echo message="hello ${who}"/>
      </target>
      <target name="main" depends="prep">
        <antcall target="greet">
          <param name="who" value="inner"/>
        </antcall>
        <antcall target="greet" inheritall="false"/>
        <echo message="leaked=${leaked} who=${who}"/>
      </target>
    </project>"#,
    &["main"],
  );
  result.unwrap();

  assert_eq!(
    listener.messages(MessageLevel::Info),
    vec![
      "prep",
      "prep",
      "hello inner",
      "prep",
      "hello ${who}",
      "leaked=${leaked} who=outer"
    ]
  );
}

#[test]
fn antcall_inherits_user_properties() {
  let (mut project, listener) = load(
    r#"<project>
      <target name="show"><echo message="${mode}"/></target>
      <target name="main"><antcall target="show" inheritall="false"/></target>
    </project>"#,
  );
  project.properties_mut().set_user("mode", "release");
  project.execute_targets(&names(&["main"])).unwrap();
  assert_eq!(listener.messages(MessageLevel::Info), vec!["release"]);
}

#[test]
fn antcall_failure_keeps_inner_location() {
  let (result, _) = run(
    "<project>\n<target name=\"inner\">\n  <fail message=\"deep\"/>\n</target>\n<target name=\"outer\">\n  <antcall target=\"inner\"/>\n</target>\n</project>",
    &["outer"],
  );
  let err = result.unwrap_err();
  assert_eq!(err.location().line, 3);
  assert_eq!(err.exit_status(), None);
  assert!(err.to_string().ends_with("deep"));
}

// =============================================================================
// Executor equivalence
// =============================================================================

/// Build a project whose target `tN` may only depend on targets with a lower index.
fn dag_source(deps: &[Vec<usize>]) -> String {
  let mut source = String::from("<project>\n");
  for (index, prerequisites) in deps.iter().enumerate() {
    let depends: Vec<String> = prerequisites.iter().map(|p| format!("t{p}")).collect();
    source.push_str(&format!("  <target name=\"t{index}\" depends=\"{}\"/>\n", depends.join(",")));
  }
  source.push_str("</project>");
  source
}

fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
  (1usize..10).prop_flat_map(|size| {
    (0..size)
      .map(|index| proptest::sample::subsequence((0..index).collect::<Vec<_>>(), 0..=index))
      .collect::<Vec<_>>()
  })
}

fn started_with(kind: ExecutorKind, source: &str, request: &[String]) -> Vec<String> {
  let (mut project, listener) = load(source);
  project.set_executor(kind.create());
  project.execute_targets(request).unwrap();
  listener.targets_started()
}

proptest! {
  #[test]
  fn default_and_single_check_agree_on_success(
    deps in dag_strategy(),
    picks in proptest::collection::vec(any::<prop::sample::Index>(), 1..5),
  ) {
    let source = dag_source(&deps);
    let request: Vec<String> = picks.iter().map(|pick| format!("t{}", pick.index(deps.len()))).collect();

    let default = started_with(ExecutorKind::Default, &source, &request);
    let single = started_with(ExecutorKind::SingleCheck, &source, &request);
    prop_assert_eq!(default, single);
  }
}
