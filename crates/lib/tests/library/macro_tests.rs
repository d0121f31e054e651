use antler_lib::MessageLevel;

use super::common::{load, run};

#[test]
fn each_use_gets_a_fresh_copy() {
  let (result, listener) = run(
    r#"<project>
      <macrodef name="announce">
        <attribute name="what"/>
        <attribute name="suffix" default="@{what}!"/>
        <sequential>
          <property name="last" value="@{what}"/>
          <echo message="@{what} ${last} @{suffix}"/>
        </sequential>
      </macrodef>
      <target name="t">
        <announce what="one"/>
        <announce what="two" suffix="?"/>
      </target>
    </project>"#,
    &["t"],
  );
  result.unwrap();
  // properties are immutable, so the second use still sees the first value
  assert_eq!(listener.messages(MessageLevel::Info), vec!["one one one!", "two one ?"]);
}

#[test]
fn attribute_values_see_properties_at_call_time() {
  let (result, listener) = run(
    r#"<project>
      <macrodef name="show">
        <attribute name="value"/>
        <sequential><echo message="@{value}"/></sequential>
      </macrodef>
      <target name="t">
        <property name="later" value="set"/>
        <show value="${later}"/>
      </target>
    </project>"#,
    &["t"],
  );
  result.unwrap();
  assert_eq!(listener.messages(MessageLevel::Info), vec!["set"]);
}

#[test]
fn slots_receive_caller_elements() {
  let (result, listener) = run(
    r#"<project>
      <macrodef name="wrap">
        <element name="body"/>
        <element name="cleanup" optional="true"/>
        <sequential>
          <echo message="before"/>
          <body/>
          <cleanup/>
          <echo message="after"/>
        </sequential>
      </macrodef>
      <target name="t">
        <wrap>
          <body>
            <echo message="inside 1"/>
            <echo message="inside 2"/>
          </body>
        </wrap>
      </target>
    </project>"#,
    &["t"],
  );
  result.unwrap();
  assert_eq!(
    listener.messages(MessageLevel::Info),
    vec!["before", "inside 1", "inside 2", "after"]
  );
}

#[test]
fn macros_can_call_macros() {
  let (result, listener) = run(
    r#"<project>
      <macrodef name="inner">
        <attribute name="x"/>
        <sequential><echo message="inner @{x}"/></sequential>
      </macrodef>
      <macrodef name="outer">
        <attribute name="x"/>
        <element name="extra" implicit="true"/>
        <sequential>
          <inner x="@{x}-a"/>
          <extra/>
          <inner x="@{x}-b"/>
        </sequential>
      </macrodef>
      <target name="t">
        <outer x="v">
          <echo message="extra"/>
        </outer>
      </target>
    </project>"#,
    &["t"],
  );
  result.unwrap();
  assert_eq!(
    listener.messages(MessageLevel::Info),
    vec!["inner v-a", "extra", "inner v-b"]
  );
}

#[test]
fn macro_defined_inside_target_is_available_afterwards() {
  let (mut project, listener) = load(
    r#"<project>
      <target name="define">
        <macrodef name="hi">
          <sequential><echo message="hi"/></sequential>
        </macrodef>
      </target>
      <target name="use" depends="define">
        <hi/>
      </target>
    </project>"#,
  );
  project.execute_targets(&["use".to_string()]).unwrap();
  assert_eq!(listener.messages(MessageLevel::Info), vec!["hi"]);
}

#[test]
fn missing_attribute_reports_call_site() {
  let (result, _) = run(
    "<project>\n<macrodef name=\"m\">\n  <attribute name=\"need\"/>\n  <sequential/>\n</macrodef>\n<target name=\"t\">\n  <m/>\n</target>\n</project>",
    &["t"],
  );
  let err = result.unwrap_err();
  assert_eq!(err.location().line, 7);
  assert!(err.to_string().ends_with("required attribute need not set"), "{err}");
}
