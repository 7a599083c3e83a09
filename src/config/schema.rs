use crate::rule::{Expect, Rule, RuleError};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// The only encoding a patch script may declare.
pub const UTF8: &str = "utf-8";

fn default_encoding() -> String {
    UTF8.to_string()
}

/// One target file plus the ordered rules applied to it.
#[derive(Debug, Deserialize, Clone)]
pub struct PatchScript {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Absolute, or relative to the workspace root
    #[serde(default)]
    pub target: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Printed after a successful run
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            target: String::new(),
            encoding: default_encoding(),
            notes: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: RuleKind,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    /// Required match count; omitted means any count
    #[serde(default)]
    pub expect: Option<usize>,
    /// Expand `$name` capture references (regex rules only)
    #[serde(default)]
    pub expand: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    Literal,
    Regex,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Literal => write!(f, "literal"),
            RuleKind::Regex => write!(f, "regex"),
        }
    }
}

impl RuleDefinition {
    pub fn compile(&self) -> Result<Rule, RuleError> {
        let rule = match self.kind {
            RuleKind::Literal => Rule::literal(&self.id, &self.pattern, &self.replacement)?,
            RuleKind::Regex => {
                let rule = Rule::regex(&self.id, &self.pattern, &self.replacement)?;
                if self.expand {
                    rule.expand_captures()
                } else {
                    rule
                }
            }
        };

        let rule = match self.expect {
            Some(n) => rule.with_expect(Expect::Exactly(n)),
            None => rule,
        };

        Ok(match &self.description {
            Some(description) => rule.with_description(description),
            None => rule,
        })
    }
}

impl PatchScript {
    /// Resolve the target against `workspace` unless it is already absolute.
    pub fn target_path(&self, workspace: &Path) -> PathBuf {
        let target = Path::new(&self.meta.target);
        if target.is_absolute() {
            target.to_path_buf()
        } else {
            workspace.join(target)
        }
    }

    /// Compile every rule definition, in script order.
    pub fn compile(&self) -> Result<Vec<Rule>, RuleError> {
        self.rules.iter().map(RuleDefinition::compile).collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.meta.target.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                rule_id: None,
                field: "meta.target",
            });
        }

        if !self.meta.encoding.eq_ignore_ascii_case(UTF8)
            && !self.meta.encoding.eq_ignore_ascii_case("utf8")
        {
            issues.push(ValidationIssue::UnsupportedEncoding(
                self.meta.encoding.clone(),
            ));
        }

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            let rule_id = (!rule.id.trim().is_empty()).then(|| rule.id.clone());

            match &rule_id {
                None => issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                }),
                Some(id) => {
                    if !seen.insert(rule.id.as_str()) {
                        issues.push(ValidationIssue::DuplicateId(id.clone()));
                    }
                }
            }

            if rule.pattern.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: rule_id.clone(),
                    field: "pattern",
                });
            }

            if rule.expect == Some(0) {
                issues.push(ValidationIssue::InvalidCombo {
                    rule_id: rule_id.clone(),
                    message: "expect must be at least 1 (omit it to allow any count)"
                        .to_string(),
                });
            }

            match rule.kind {
                RuleKind::Literal => {
                    if rule.expand {
                        issues.push(ValidationIssue::InvalidCombo {
                            rule_id: rule_id.clone(),
                            message: "expand only applies to regex rules".to_string(),
                        });
                    }
                }
                RuleKind::Regex => {
                    if !rule.pattern.is_empty() {
                        if let Err(RuleError::Regex { source, .. }) = rule.compile() {
                            issues.push(ValidationIssue::InvalidRegex {
                                rule_id: rule_id.clone(),
                                message: source.to_string(),
                            });
                        }
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId(String),
    UnsupportedEncoding(String),
    InvalidRegex {
        rule_id: Option<String>,
        message: String,
    },
    InvalidCombo {
        rule_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "patch script contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId(id) => write!(f, "rule id '{id}' is used more than once"),
            ValidationIssue::UnsupportedEncoding(encoding) => {
                write!(f, "unsupported encoding '{encoding}' (only utf-8 is supported)")
            }
            ValidationIssue::InvalidRegex { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has an invalid regex: {message}"),
                None => write!(f, "invalid regex: {message}"),
            },
            ValidationIssue::InvalidCombo { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(id: &str, pattern: &str) -> RuleDefinition {
        RuleDefinition {
            id: id.to_string(),
            description: None,
            kind: RuleKind::Literal,
            pattern: pattern.to_string(),
            replacement: "new".to_string(),
            expect: None,
            expand: false,
        }
    }

    fn script(rules: Vec<RuleDefinition>) -> PatchScript {
        PatchScript {
            meta: Metadata {
                target: "src/App.tsx".to_string(),
                ..Metadata::default()
            },
            rules,
        }
    }

    #[test]
    fn test_target_path_relative_and_absolute() {
        let mut s = script(vec![literal("a", "old")]);
        assert_eq!(
            s.target_path(Path::new("/work")),
            PathBuf::from("/work/src/App.tsx")
        );

        let absolute = std::env::temp_dir().join("App.tsx");
        s.meta.target = absolute.display().to_string();
        assert_eq!(s.target_path(Path::new("/work")), absolute);
    }

    #[test]
    fn test_compile_carries_expect_and_description() {
        let mut def = literal("a", "old");
        def.expect = Some(2);
        def.description = Some("swap".to_string());

        let rule = def.compile().unwrap();
        assert_eq!(rule.expect(), Expect::Exactly(2));
        assert_eq!(rule.description.as_deref(), Some("swap"));
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let s = script(vec![literal("a", "x"), literal("a", "y")]);
        let err = s.validate().unwrap_err();
        assert_eq!(err.issues, vec![ValidationIssue::DuplicateId("a".into())]);
    }

    #[test]
    fn test_validate_expand_on_literal() {
        let mut def = literal("a", "x");
        def.expand = true;
        let err = script(vec![def]).validate().unwrap_err();
        assert!(matches!(
            err.issues[0],
            ValidationIssue::InvalidCombo { .. }
        ));
    }

    #[test]
    fn test_validate_collects_every_issue() {
        let mut s = script(vec![literal("", "")]);
        s.meta.target.clear();
        s.meta.encoding = "latin-1".to_string();

        let err = s.validate().unwrap_err();
        assert_eq!(err.issues.len(), 4);
        assert!(err.to_string().contains("meta.target"));
        assert!(err.to_string().contains("latin-1"));
    }
}
