//! Shell script rendering from named template sections.
//!
//! A family's template is a set of [`Section`]s of shell text containing
//! `{{name}}` placeholders. Template data is flattened into [`TemplateVars`]
//! (values are shell-quoted on insertion) and [`render`] concatenates the
//! sections the caller selected, substituting every placeholder. Rendering
//! performs no I/O.

use std::collections::BTreeMap;

use log::trace;
use thiserror::Error;

/// Errors raised while rendering a template.
///
/// These indicate a defect in a family's template or template data, never a
/// runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// A placeholder names a field the template data does not provide.
    #[error("template section {section} references unknown field {field}")]
    MissingField {
        /// The section containing the placeholder.
        section: &'static str,
        /// The placeholder name.
        field: String,
    },

    /// A `{{` opening has no matching `}}`.
    #[error("template section {section} has an unterminated placeholder")]
    UnterminatedPlaceholder {
        /// The offending section.
        section: &'static str,
    },
}

/// A named block of template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    /// Section name, used in errors and logs.
    pub name: &'static str,
    /// Shell text with `{{field}}` placeholders.
    pub body: &'static str,
}

/// Flat placeholder values for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars(BTreeMap<&'static str, String>);

impl TemplateVars {
    /// Create an empty set of values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, shell-quoted.
    #[must_use]
    pub fn quoted(mut self, name: &'static str, value: &str) -> Self {
        self.0.insert(name, shell_quote(value));
        self
    }

    /// Insert a list of values as space-separated shell words.
    #[must_use]
    pub fn quoted_list<'v>(
        mut self,
        name: &'static str,
        values: impl IntoIterator<Item = &'v str>,
    ) -> Self {
        let words: Vec<String> = values.into_iter().map(shell_quote).collect();
        self.0.insert(name, words.join(" "));
        self
    }

    /// Insert a value verbatim. Only for values that are already safe shell
    /// words, such as version numbers.
    #[must_use]
    pub fn raw(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(name, value.into());
        self
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Quote `value` as a single POSIX shell word.
///
/// # Examples
///
/// ```
/// use driverforge::script::shell_quote;
///
/// assert_eq!(shell_quote("/tmp/driver"), "'/tmp/driver'");
/// assert_eq!(shell_quote("it's"), r"'it'\''s'");
/// ```
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render `sections` in order, separated by blank lines.
///
/// # Errors
///
/// Returns [`SynthesisError`] when a section references a field absent
/// from `vars` or contains an unterminated placeholder.
pub fn render(sections: &[Section], vars: &TemplateVars) -> Result<String, SynthesisError> {
    let mut script = String::new();
    for section in sections {
        trace!("rendering section {}", section.name);
        if !script.is_empty() {
            script.push('\n');
        }
        script.push_str(&render_section(section, vars)?);
    }
    Ok(script)
}

fn render_section(section: &Section, vars: &TemplateVars) -> Result<String, SynthesisError> {
    let mut out = String::with_capacity(section.body.len());
    let mut rest = section.body;
    while let Some((before, after_open)) = rest.split_once("{{") {
        out.push_str(before);
        let (field, after_close) = after_open.split_once("}}").ok_or(
            SynthesisError::UnterminatedPlaceholder {
                section: section.name,
            },
        )?;
        let field = field.trim();
        let value = vars.get(field).ok_or_else(|| SynthesisError::MissingField {
            section: section.name,
            field: field.to_owned(),
        })?;
        out.push_str(value);
        rest = after_close;
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const GREETING: Section = Section {
        name: "greeting",
        body: "echo {{ who }}\ncd {{dir}}\n",
    };

    #[test]
    fn substitutes_placeholders() {
        let vars = TemplateVars::new()
            .quoted("who", "world")
            .raw("dir", "/tmp");
        let script = render(&[GREETING], &vars).expect("renders");
        assert_eq!(script, "echo 'world'\ncd /tmp\n");
    }

    #[test]
    fn separates_sections_with_blank_line() {
        let tail = Section {
            name: "tail",
            body: "exit 0\n",
        };
        let vars = TemplateVars::new().raw("who", "x").raw("dir", "y");
        let script = render(&[GREETING, tail], &vars).expect("renders");
        assert!(script.ends_with("cd y\n\nexit 0\n"));
    }

    #[test]
    fn missing_field_names_section_and_field() {
        let vars = TemplateVars::new().raw("who", "x");
        let err = render(&[GREETING], &vars).expect_err("dir is missing");
        assert_eq!(
            err,
            SynthesisError::MissingField {
                section: "greeting",
                field: "dir".to_owned()
            }
        );
    }

    #[test]
    fn unterminated_placeholder_is_reported() {
        let broken = Section {
            name: "broken",
            body: "echo {{ who\n",
        };
        let vars = TemplateVars::new().raw("who", "x");
        assert_eq!(
            render(&[broken], &vars),
            Err(SynthesisError::UnterminatedPlaceholder { section: "broken" })
        );
    }

    #[test]
    fn shell_parameter_expansion_is_left_alone() {
        let section = Section {
            name: "shell",
            body: "echo \"${HOME}\" $(uname -r)\n",
        };
        let script = render(&[section], &TemplateVars::new()).expect("no placeholders");
        assert_eq!(script, "echo \"${HOME}\" $(uname -r)\n");
    }

    #[rstest]
    #[case("plain", "'plain'")]
    #[case("with space", "'with space'")]
    #[case("a'b", r"'a'\''b'")]
    #[case("$(rm -rf /)", "'$(rm -rf /)'")]
    fn quotes_shell_words(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(shell_quote(input), expected);
    }

    #[test]
    fn quoted_list_joins_words() {
        let vars = TemplateVars::new().quoted_list("urls", ["http://a/x.deb", "http://b/y.deb"]);
        assert_eq!(vars.get("urls"), Some("'http://a/x.deb' 'http://b/y.deb'"));
    }
}
