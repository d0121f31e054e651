//! `@{name}` parameter substitution.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  Normal,
  ExpectBracket,
  ExpectName,
}

/// Replace `@{name}` tokens with values from `values`.
///
/// Names are looked up lower-cased. Unknown names are written back as
/// `@{name}`, `@@` yields a single `@`, and an unterminated token at the end
/// of the input is copied literally.
pub fn macro_subs(input: &str, values: &HashMap<String, String>) -> String {
  if !input.contains('@') {
    return input.to_string();
  }

  let mut out = String::with_capacity(input.len());
  let mut name = String::new();
  let mut state = State::Normal;

  for ch in input.chars() {
    match state {
      State::Normal => {
        if ch == '@' {
          state = State::ExpectBracket;
        } else {
          out.push(ch);
        }
      }
      State::ExpectBracket => {
        match ch {
          '{' => {
            name.clear();
            state = State::ExpectName;
            continue;
          }
          '@' => out.push('@'),
          other => {
            out.push('@');
            out.push(other);
          }
        }
        state = State::Normal;
      }
      State::ExpectName => {
        if ch == '}' {
          let key = name.to_lowercase();
          match values.get(&key) {
            Some(value) => out.push_str(value),
            None => {
              out.push_str("@{");
              out.push_str(&key);
              out.push('}');
            }
          }
          state = State::Normal;
        } else {
          name.push(ch);
        }
      }
    }
  }

  match state {
    State::Normal => {}
    State::ExpectBracket => out.push('@'),
    State::ExpectName => {
      out.push_str("@{");
      out.push_str(&name);
    }
  }

  out
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  #[test]
  fn substitutes_known_names() {
    assert_eq!(macro_subs("x@{a}y", &values(&[("a", "Z")])), "xZy");
  }

  #[test]
  fn names_are_case_folded() {
    assert_eq!(macro_subs("@{Dest}/@{DEST}", &values(&[("dest", "out")])), "out/out");
  }

  #[test]
  fn unknown_names_pass_through() {
    assert_eq!(macro_subs("@{missing}", &values(&[])), "@{missing}");
    assert_eq!(macro_subs("@{Missing}", &values(&[])), "@{missing}");
  }

  #[test]
  fn double_at_escapes() {
    assert_eq!(macro_subs("a@@{b}", &values(&[("b", "Q")])), "a@{b}");
  }

  #[test]
  fn lone_at_is_kept() {
    assert_eq!(macro_subs("user@host", &values(&[])), "user@host");
    assert_eq!(macro_subs("trailing@", &values(&[])), "trailing@");
  }

  #[test]
  fn unterminated_token_is_literal() {
    assert_eq!(macro_subs("x@{abc", &values(&[("abc", "no")])), "x@{abc");
  }

  #[test]
  fn values_are_not_rescanned() {
    assert_eq!(macro_subs("@{a}", &values(&[("a", "@{b}"), ("b", "no")])), "@{b}");
  }

  proptest! {
    #[test]
    fn identity_without_tokens_or_escapes(input in "([a-z {}$]|@[a-z $}]){0,30}") {
      prop_assert_eq!(macro_subs(&input, &values(&[("a", "Z")])), input);
    }
  }
}
