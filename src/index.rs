//! Package filename matching against repository index pages.
//!
//! A mirror's directory listing is an HTML page of `href="..."` links.
//! [`PackageIndexMatcher`] holds an ordered list of [`NamingScheme`]s and
//! returns the package filenames matched by the first scheme that matches
//! anything. Families build their schemes from a kernel release; the matcher
//! itself knows nothing about distributions.

use log::debug;
use regex::Regex;

/// One historical convention for encoding a kernel release into a package
/// filename.
///
/// The pattern's first capture group is the filename.
#[derive(Debug, Clone)]
pub struct NamingScheme {
    name: &'static str,
    pattern: Regex,
}

impl NamingScheme {
    /// Compile a naming scheme.
    ///
    /// # Errors
    ///
    /// Returns the regex compilation error for a malformed pattern.
    pub fn new(name: &'static str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
        })
    }

    /// A short label used in log output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Every filename this scheme matches in `body`, in page order, without
    /// duplicates.
    #[must_use]
    pub fn matches(&self, body: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for captures in self.pattern.captures_iter(body) {
            if let Some(filename) = captures.get(1) {
                let filename = filename.as_str();
                if !found.iter().any(|f| f == filename) {
                    found.push(filename.to_owned());
                }
            }
        }
        found
    }
}

/// Ordered naming-scheme fallback over a raw index page.
///
/// # Examples
///
/// ```
/// use driverforge::index::{NamingScheme, PackageIndexMatcher};
///
/// let matcher = PackageIndexMatcher::new(vec![
///     NamingScheme::new("older", r#"href="(pkg-1\.0_[^"]*\.deb)""#).expect("valid"),
///     NamingScheme::new("newer", r#"href="(pkg_1\.0[^"]*\.deb)""#).expect("valid"),
/// ]);
/// let page = r#"<a href="pkg_1.0-2_all.deb">pkg_1.0-2_all.deb</a>"#;
/// assert_eq!(matcher.candidates(page), vec!["pkg_1.0-2_all.deb".to_owned()]);
/// ```
#[derive(Debug, Clone)]
pub struct PackageIndexMatcher {
    schemes: Vec<NamingScheme>,
}

impl PackageIndexMatcher {
    /// Create a matcher that tries `schemes` in order.
    #[must_use]
    pub const fn new(schemes: Vec<NamingScheme>) -> Self {
        Self { schemes }
    }

    /// The schemes in the order they are tried.
    #[must_use]
    pub fn schemes(&self) -> &[NamingScheme] {
        &self.schemes
    }

    /// Candidate filenames from the first scheme producing at least one
    /// match, or an empty list when no scheme matches.
    #[must_use]
    pub fn candidates(&self, body: &str) -> Vec<String> {
        self.first_matching(body)
            .map(|(_, found)| found)
            .unwrap_or_default()
    }

    /// Like [`Self::candidates`] but also reports which scheme won.
    #[must_use]
    pub fn first_matching(&self, body: &str) -> Option<(&NamingScheme, Vec<String>)> {
        self.schemes.iter().find_map(|scheme| {
            let found = scheme.matches(body);
            if found.is_empty() {
                debug!("naming scheme {} matched nothing", scheme.name());
                None
            } else {
                Some((scheme, found))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PackageIndexMatcher {
        PackageIndexMatcher::new(vec![
            NamingScheme::new("older", r#"href="(tool-1\.2-[^"]*\.deb)""#).expect("valid"),
            NamingScheme::new("newer", r#"href="(tool_1\.2[^"]*\.deb)""#).expect("valid"),
        ])
    }

    #[test]
    fn older_scheme_wins_when_both_match() {
        let page = concat!(
            "<a href=\"tool_1.2-5_amd64.deb\">x</a>\n",
            "<a href=\"tool-1.2-3_amd64.deb\">y</a>\n",
        );
        let matcher = matcher();
        let (scheme, found) = matcher.first_matching(page).expect("a scheme matches");
        assert_eq!(scheme.name(), "older");
        assert_eq!(found, vec!["tool-1.2-3_amd64.deb".to_owned()]);
    }

    #[test]
    fn falls_back_to_newer_scheme() {
        let page = "<a href=\"tool_1.2-5_amd64.deb\">x</a>";
        assert_eq!(matcher().candidates(page), vec!["tool_1.2-5_amd64.deb".to_owned()]);
    }

    #[test]
    fn no_match_yields_no_candidates() {
        let page = "<a href=\"other_9.9_amd64.deb\">x</a>";
        assert!(matcher().candidates(page).is_empty());
        assert!(matcher().first_matching(page).is_none());
    }

    #[test]
    fn duplicate_links_are_reported_once() {
        let page = concat!(
            "<a href=\"tool-1.2-3_amd64.deb\">tool-1.2-3_amd64.deb</a>\n",
            "<a href=\"tool-1.2-3_amd64.deb\">again</a>\n",
            "<a href=\"tool-1.2-4_amd64.deb\">tool-1.2-4_amd64.deb</a>\n",
        );
        assert_eq!(
            matcher().candidates(page),
            vec![
                "tool-1.2-3_amd64.deb".to_owned(),
                "tool-1.2-4_amd64.deb".to_owned()
            ]
        );
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(NamingScheme::new("broken", "href=\"(unclosed").is_err());
    }
}
