use regex::{NoExpand, Regex, RegexBuilder};
use std::borrow::Cow;
use thiserror::Error;

/// Minimum normalized similarity for a line to be offered as a drift hint.
const HINT_THRESHOLD: f64 = 0.6;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{id}' has an empty pattern")]
    EmptyPattern { id: String },

    #[error("rule '{id}' has an invalid regex: {source}")]
    Regex {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// How a rule finds the text it replaces.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact substring match
    Literal(String),
    /// Regular expression, compiled with dot-matches-all
    Regex {
        regex: Regex,
        /// Expand `$name` capture references in the replacement
        expand: bool,
    },
}

/// Number of matches a rule requires before the run may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expect {
    /// Any count, including zero
    #[default]
    Any,
    /// Exactly this many matches
    Exactly(usize),
}

impl Expect {
    pub fn is_met(&self, count: usize) -> bool {
        match self {
            Expect::Any => true,
            Expect::Exactly(n) => *n == count,
        }
    }
}

/// Result of applying one rule to a text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution<'a> {
    /// Transformed text; borrowed when nothing matched
    pub text: Cow<'a, str>,
    /// Number of matches that were replaced
    pub count: usize,
}

/// A line in the current text that closely resembles a literal pattern
/// which no longer matches.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftHint {
    /// 1-based line number
    pub line: usize,
    pub similarity: f64,
    pub text: String,
}

/// One ordered substitution: a match pattern plus its replacement text.
///
/// Every occurrence of the pattern is replaced. A pattern that matches
/// nothing leaves the text unchanged.
#[derive(Debug, Clone)]
#[must_use = "Rule does nothing until apply() is called"]
pub struct Rule {
    pub id: String,
    pub description: Option<String>,
    matcher: Matcher,
    replacement: String,
    expect: Expect,
}

impl Rule {
    /// Exact substring replacement.
    pub fn literal(
        id: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(RuleError::EmptyPattern { id });
        }
        Ok(Self {
            id,
            description: None,
            matcher: Matcher::Literal(pattern),
            replacement: replacement.into(),
            expect: Expect::Any,
        })
    }

    /// Regex replacement with `.` matching newlines, so a multi-line block
    /// can be matched as one unit. The replacement is inserted verbatim.
    pub fn regex(
        id: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        if pattern.is_empty() {
            return Err(RuleError::EmptyPattern { id });
        }
        let regex = RegexBuilder::new(pattern)
            .dot_matches_new_line(true)
            .build()
            .map_err(|source| RuleError::Regex {
                id: id.clone(),
                source,
            })?;
        Ok(Self {
            id,
            description: None,
            matcher: Matcher::Regex {
                regex,
                expand: false,
            },
            replacement: replacement.into(),
            expect: Expect::Any,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }

    /// Enable `$name` / `${1}` expansion in the replacement. No effect on
    /// literal rules.
    pub fn expand_captures(mut self) -> Self {
        if let Matcher::Regex { expand, .. } = &mut self.matcher {
            *expand = true;
        }
        self
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn expect(&self) -> Expect {
        self.expect
    }

    /// Count non-overlapping matches in `text`.
    pub fn count(&self, text: &str) -> usize {
        match &self.matcher {
            Matcher::Literal(pattern) => text.matches(pattern.as_str()).count(),
            Matcher::Regex { regex, .. } => regex.find_iter(text).count(),
        }
    }

    /// Replace every match in `text`.
    pub fn apply<'a>(&self, text: &'a str) -> Substitution<'a> {
        let count = self.count(text);
        if count == 0 {
            return Substitution {
                text: Cow::Borrowed(text),
                count,
            };
        }

        let text = match &self.matcher {
            Matcher::Literal(pattern) => {
                Cow::Owned(text.replace(pattern.as_str(), &self.replacement))
            }
            Matcher::Regex {
                regex,
                expand: true,
            } => regex.replace_all(text, self.replacement.as_str()),
            Matcher::Regex {
                regex,
                expand: false,
            } => regex.replace_all(text, NoExpand(self.replacement.as_str())),
        };

        Substitution { text, count }
    }

    /// For a literal rule, find the line of `text` most similar to the
    /// pattern's first non-blank line. Regex rules never produce a hint.
    pub fn drift_hint(&self, text: &str) -> Option<DriftHint> {
        let Matcher::Literal(pattern) = &self.matcher else {
            return None;
        };
        let needle = pattern.lines().map(str::trim).find(|l| !l.is_empty())?;

        text.lines()
            .enumerate()
            .map(|(idx, line)| {
                let similarity = strsim::normalized_levenshtein(needle, line.trim());
                (idx, line, similarity)
            })
            .filter(|(_, _, similarity)| *similarity >= HINT_THRESHOLD)
            .max_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(idx, line, similarity)| DriftHint {
                line: idx + 1,
                similarity,
                text: line.trim().to_string(),
            })
    }
}
