//! `{N}` placeholder substitution for array-runner command lines
//!
//! `{1}` is the row's first value, `{2}` the second, and so on.
//! `{{` and `}}` produce literal braces. Any other brace text (`${HOME}`,
//! `{name}`) passes through untouched so shell syntax survives.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{PipeError, Result};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{|\}\}|\{(\d+)\}").expect("placeholder regex is valid"));

/// Substitute `{N}` placeholders in `template` with values from `row`
///
/// Returns `Cow::Borrowed` when there is nothing to substitute.
pub fn substitute<'a, S: AsRef<str>>(template: &'a str, row: &[S]) -> Result<Cow<'a, str>> {
    if !template.contains('{') && !template.contains('}') {
        return Ok(Cow::Borrowed(template));
    }

    let mut missing = None;
    let out = PLACEHOLDER_RE.replace_all(template, |caps: &Captures| -> String {
        match caps.get(1) {
            None if &caps[0] == "{{" => "{".to_string(),
            None => "}".to_string(),
            Some(digits) => {
                let value = digits
                    .as_str()
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| row.get(i));
                match value {
                    Some(v) => v.as_ref().to_string(),
                    None => {
                        missing.get_or_insert_with(|| digits.as_str().parse().unwrap_or(0));
                        String::new()
                    }
                }
            }
        }
    });

    match missing {
        Some(index) => Err(PipeError::MissingPlaceholder {
            index,
            available: row.len(),
        }),
        None => Ok(out),
    }
}

/// Substitute every argument of a command line
pub fn substitute_all<S: AsRef<str>>(templates: &[String], row: &[S]) -> Result<Vec<String>> {
    templates
        .iter()
        .map(|t| substitute(t, row).map(Cow::into_owned))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_numbered_slots() {
        let row = ["a.txt", "b.txt"];
        assert_eq!(substitute("{2} <- {1}", &row).unwrap(), "b.txt <- a.txt");
    }

    #[test]
    fn plain_text_is_borrowed() {
        let row: [&str; 0] = [];
        assert!(matches!(
            substitute("no placeholders", &row).unwrap(),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn doubled_braces_escape() {
        let row = ["x"];
        assert_eq!(substitute("{{1}} {1}", &row).unwrap(), "{1} x");
        assert_eq!(substitute("awk '{{print $2}}'", &row).unwrap(), "awk '{print $2}'");
    }

    #[test]
    fn shell_braces_pass_through() {
        let row = ["x"];
        assert_eq!(substitute("${HOME}/{1}", &row).unwrap(), "${HOME}/x");
    }

    #[test]
    fn missing_slot_is_an_error() {
        let row = ["only"];
        let err = substitute("{1} {3}", &row).unwrap_err();
        assert!(matches!(
            err,
            PipeError::MissingPlaceholder {
                index: 3,
                available: 1
            }
        ));
    }

    #[test]
    fn slot_zero_is_never_filled() {
        let row = ["a"];
        assert!(substitute("{0}", &row).is_err());
    }

    #[test]
    fn substitutes_whole_argv() {
        let argv = vec!["grep".to_string(), "-e".to_string(), "{1}".to_string()];
        assert_eq!(
            substitute_all(&argv, &["^def"]).unwrap(),
            vec!["grep", "-e", "^def"]
        );
    }
}
