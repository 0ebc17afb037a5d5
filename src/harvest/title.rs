//! Title parser for dependency-bump pull requests.
//!
//! Bump PR titles follow a fixed grammar:
//!
//! ```text
//! [Security] Bump <library> from <from> to <to> in /<directory>
//! Update <library> requirement from <from> to <to>
//! ```
//!
//! The security prefix, the `requirement` suffix and the directory clause
//! are optional. The language is not part of the title; it comes from the
//! PR's labels, filtered through an allow-list.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::model::DependencyBump;
use crate::traits::ParseError;

/// Labels recognised as languages unless configured otherwise.
pub const DEFAULT_LANGUAGE_LABELS: &[&str] = &[
    "ruby",
    "javascript",
    "python",
    "elixir",
    "rust",
    "java",
    "go",
    "elm",
];

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<security>\[Security\] )?(?:Bump|Update) (?P<library>\S+)(?: requirement)? from (?P<from_version>.+?) to (?P<to_version>.+?)(?: in /(?P<directory>.+?))?$",
    )
    .expect("title pattern is a valid regex")
});

/// Maps PR titles and labels to [`DependencyBump`] facts.
#[derive(Debug, Clone)]
pub struct TitleParser {
    languages: BTreeSet<String>,
}

impl Default for TitleParser {
    fn default() -> Self {
        Self::with_languages(DEFAULT_LANGUAGE_LABELS.iter().copied())
    }
}

impl TitleParser {
    pub fn with_languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a title into a complete fact.
    ///
    /// There is no partial result: either every field of the grammar
    /// matched, or [`ParseError::PatternNotMatched`] is returned.
    pub fn parse<'a, I>(&self, title: &str, labels: I) -> Result<DependencyBump, ParseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let captures =
            TITLE_PATTERN
                .captures(title)
                .ok_or_else(|| ParseError::PatternNotMatched {
                    title: title.to_string(),
                })?;

        let group = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        Ok(DependencyBump {
            library: group("library"),
            language: self.resolve_language(title, labels),
            from_version: group("from_version"),
            to_version: group("to_version"),
            directory: group("directory"),
            security: captures.name("security").is_some(),
        })
    }

    /// Picks the language label. Several recognised labels resolve to the
    /// lexicographically first one.
    fn resolve_language<'a, I>(&self, title: &str, labels: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let found: BTreeSet<&str> = labels
            .into_iter()
            .filter(|label| self.languages.contains(*label))
            .collect();

        if found.len() > 1 {
            warn!(
                title,
                languages = ?found,
                "multiple language labels on pull request"
            );
        }

        found
            .into_iter()
            .next()
            .map(str::to_string)
            .unwrap_or_default()
    }
}
