//! Patch runner - applies an ordered rule list to a single target file
//!
//! A run is split in three steps so callers can report between them:
//! - [`PatchRunner::plan`] reads the target and applies every rule in memory
//! - [`RunReport::verify`] checks match counts against each rule's expectation
//! - [`RunReport::commit`] writes the patched text back over the target
//!
//! [`PatchRunner::run`] chains all three.

use crate::config::PatchScript;
use crate::rule::{DriftHint, Expect, Rule, RuleError};
use crate::write::{self, WriteError};
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to one rule during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleStatus {
    /// A declared count was met, or at least one match was replaced
    Applied,
    /// Nothing matched and no count was declared; the rule was a no-op
    NoMatch { hint: Option<DriftHint> },
    /// The rule declared an exact count that was not met
    CountMismatch { expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub id: String,
    pub description: Option<String>,
    /// Matches replaced
    pub count: usize,
    pub status: RuleStatus,
}

/// Line terminator convention of the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    /// Every `\n` is preceded by `\r`
    Crlf,
}

impl LineEnding {
    pub fn detect(text: &str) -> Self {
        let newlines = text.matches('\n').count();
        if newlines > 0 && text.matches("\r\n").count() == newlines {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Treat rules that matched nothing as errors
    pub strict: bool,
    /// Stop after verification; never write
    pub dry_run: bool,
}

/// Errors during a run
#[derive(Debug)]
pub enum RunError {
    /// Target could not be read or is not valid UTF-8
    Read { path: PathBuf, source: io::Error },
    /// A rule failed to compile
    Rule(RuleError),
    /// A rule's declared match count was not met
    CountMismatch {
        path: PathBuf,
        rule: String,
        expected: usize,
        found: usize,
    },
    /// Strict mode: one or more rules matched nothing
    Unmatched { path: PathBuf, rules: Vec<String> },
    /// Target could not be overwritten
    Write(WriteError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Read { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            RunError::Rule(e) => write!(f, "{}", e),
            RunError::CountMismatch {
                path,
                rule,
                expected,
                found,
            } => write!(
                f,
                "rule '{}' expected {} match(es) in {}, found {}",
                rule,
                expected,
                path.display(),
                found
            ),
            RunError::Unmatched { path, rules } => write!(
                f,
                "{} rule(s) matched nothing in {}: {}",
                rules.len(),
                path.display(),
                rules.join(", ")
            ),
            RunError::Write(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Read { source, .. } => Some(source),
            RunError::Rule(e) => Some(e),
            RunError::Write(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RuleError> for RunError {
    fn from(e: RuleError) -> Self {
        RunError::Rule(e)
    }
}

impl From<WriteError> for RunError {
    fn from(e: WriteError) -> Self {
        RunError::Write(e)
    }
}

/// In-memory result of applying every rule to the target.
#[derive(Debug, Clone)]
#[must_use = "RunReport does nothing until commit() is called"]
pub struct RunReport {
    pub target: PathBuf,
    /// One entry per rule, in rule order
    pub outcomes: Vec<RuleOutcome>,
    /// Text as read, with `\r\n` folded to `\n` for CRLF files
    pub original: String,
    pub patched: String,
    pub line_ending: LineEnding,
    /// xxh3 of the raw bytes at read time
    pub fingerprint: u64,
    pub written: bool,
}

impl RunReport {
    pub fn changed(&self) -> bool {
        self.original != self.patched
    }

    pub fn applied(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RuleStatus::Applied))
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RuleStatus::NoMatch { .. }))
    }

    /// Patched text with the file's original line endings restored.
    pub fn patched_on_disk(&self) -> Cow<'_, str> {
        match self.line_ending {
            LineEnding::Lf => Cow::Borrowed(&self.patched),
            LineEnding::Crlf => Cow::Owned(self.patched.replace('\n', "\r\n")),
        }
    }

    /// Fail on the first unmet count expectation, and in strict mode on any
    /// rule that matched nothing.
    pub fn verify(&self, strict: bool) -> Result<(), RunError> {
        if let Some((rule, expected, found)) =
            self.outcomes.iter().find_map(|o| match o.status {
                RuleStatus::CountMismatch { expected, found } => {
                    Some((o.id.clone(), expected, found))
                }
                _ => None,
            })
        {
            return Err(RunError::CountMismatch {
                path: self.target.clone(),
                rule,
                expected,
                found,
            });
        }

        if strict {
            let rules: Vec<String> = self.unmatched().map(|o| o.id.clone()).collect();
            if !rules.is_empty() {
                return Err(RunError::Unmatched {
                    path: self.target.clone(),
                    rules,
                });
            }
        }

        Ok(())
    }

    /// Overwrite the target with the patched text.
    ///
    /// Returns `false` without touching the file when the text is unchanged
    /// or was already written.
    pub fn commit(&mut self) -> Result<bool, RunError> {
        if self.written || !self.changed() {
            debug!(path = %self.target.display(), "nothing to write");
            return Ok(false);
        }

        let content = self.patched_on_disk();
        write::overwrite(&self.target, content.as_bytes(), self.fingerprint)?;

        info!(
            path = %self.target.display(),
            bytes = content.len(),
            "wrote patched file"
        );
        self.written = true;
        Ok(true)
    }
}

/// One target file plus the rules applied to it.
#[derive(Debug, Clone)]
pub struct PatchRunner {
    target: PathBuf,
    rules: Vec<Rule>,
}

impl PatchRunner {
    pub fn new(target: impl Into<PathBuf>, rules: Vec<Rule>) -> Self {
        Self {
            target: target.into(),
            rules,
        }
    }

    /// Compile a patch script, resolving a relative target against `workspace`.
    pub fn from_script(script: &PatchScript, workspace: &Path) -> Result<Self, RunError> {
        Ok(Self::new(script.target_path(workspace), script.compile()?))
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Read the target and apply every rule in order, without writing.
    pub fn plan(&self) -> Result<RunReport, RunError> {
        let bytes = fs::read(&self.target).map_err(|source| RunError::Read {
            path: self.target.clone(),
            source,
        })?;
        let fingerprint = write::fingerprint(&bytes);
        let text = String::from_utf8(bytes).map_err(|e| RunError::Read {
            path: self.target.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        let line_ending = LineEnding::detect(&text);
        let original = match line_ending {
            LineEnding::Lf => text,
            LineEnding::Crlf => text.replace("\r\n", "\n"),
        };

        let mut current = original.clone();
        let mut outcomes = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let substitution = rule.apply(&current);
            let count = substitution.count;

            let status = match rule.expect() {
                Expect::Exactly(expected) if expected != count => RuleStatus::CountMismatch {
                    expected,
                    found: count,
                },
                Expect::Exactly(_) => RuleStatus::Applied,
                Expect::Any if count == 0 => RuleStatus::NoMatch {
                    hint: rule.drift_hint(&current),
                },
                _ => RuleStatus::Applied,
            };

            match &status {
                RuleStatus::Applied => debug!(rule = %rule.id, count, "applied rule"),
                RuleStatus::NoMatch { .. } => warn!(rule = %rule.id, "pattern matched nothing"),
                RuleStatus::CountMismatch { expected, found } => {
                    warn!(rule = %rule.id, expected, found, "unexpected match count")
                }
            }

            let next = match substitution.text {
                Cow::Owned(text) => Some(text),
                Cow::Borrowed(_) => None,
            };
            if let Some(next) = next {
                current = next;
            }

            outcomes.push(RuleOutcome {
                id: rule.id.clone(),
                description: rule.description.clone(),
                count,
                status,
            });
        }

        Ok(RunReport {
            target: self.target.clone(),
            outcomes,
            original,
            patched: current,
            line_ending,
            fingerprint,
            written: false,
        })
    }

    /// Plan, verify, and (unless `dry_run`) write.
    pub fn run(&self, options: RunOptions) -> Result<RunReport, RunError> {
        let mut report = self.plan()?;
        report.verify(options.strict)?;
        if !options.dry_run {
            report.commit()?;
        }
        Ok(report)
    }
}
