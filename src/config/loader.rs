use crate::config::schema::{PatchScript, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a patch script's TOML came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOrigin {
    /// A string handed to [`load_from_str`]
    Inline,
    /// A script file on disk
    File(PathBuf),
    /// A script compiled into the binary
    Builtin(&'static str),
}

impl fmt::Display for ScriptOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptOrigin::Inline => write!(f, "<inline>"),
            ScriptOrigin::File(path) => write!(f, "{}", path.display()),
            ScriptOrigin::Builtin(name) => write!(f, "built-in {}", name),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// The script file could not be read
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Not valid TOML, or not the `[meta]` + `[[rules]]` shape
    Parse {
        origin: ScriptOrigin,
        source: toml_edit::de::Error,
    },
    /// Parsed, but `validate` found issues
    Invalid {
        origin: ScriptOrigin,
        /// `meta.name`, when the script declared one
        script: Option<String>,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn origin(&self) -> Option<&ScriptOrigin> {
        match self {
            ConfigError::Io { .. } => None,
            ConfigError::Parse { origin, .. } | ConfigError::Invalid { origin, .. } => {
                Some(origin)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read patch script {}: {}", path.display(), source)
            }
            ConfigError::Parse { origin, source } => {
                write!(f, "failed to parse patch script {}: {}", origin, source)
            }
            ConfigError::Invalid {
                origin,
                script: Some(name),
                source,
            } => write!(f, "invalid patch script '{}' ({}):\n{}", name, origin, source),
            ConfigError::Invalid {
                origin,
                script: None,
                source,
            } => write!(f, "invalid patch script {}:\n{}", origin, source),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid { source, .. } => Some(source),
        }
    }
}

/// Parse and validate a patch script, tagging errors with `origin`.
pub fn parse_script(input: &str, origin: ScriptOrigin) -> Result<PatchScript, ConfigError> {
    let script: PatchScript = match toml_edit::de::from_str(input) {
        Ok(script) => script,
        Err(source) => return Err(ConfigError::Parse { origin, source }),
    };

    if let Err(source) = script.validate() {
        let name = script.meta.name.trim();
        return Err(ConfigError::Invalid {
            origin,
            script: (!name.is_empty()).then(|| name.to_string()),
            source,
        });
    }

    Ok(script)
}

pub fn load_from_str(input: &str) -> Result<PatchScript, ConfigError> {
    parse_script(input, ScriptOrigin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchScript, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&contents, ScriptOrigin::File(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_script_names_itself() {
        let err = parse_script(
            "[meta]\nname = \"swap-state\"\ntarget = \"a.txt\"\n",
            ScriptOrigin::Builtin("swap-state"),
        )
        .unwrap_err();

        assert_eq!(err.origin(), Some(&ScriptOrigin::Builtin("swap-state")));
        match &err {
            ConfigError::Invalid { script, .. } => {
                assert_eq!(script.as_deref(), Some("swap-state"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err
            .to_string()
            .starts_with("invalid patch script 'swap-state' (built-in swap-state):"));
    }

    #[test]
    fn test_unnamed_inline_script() {
        let err = load_from_str("[meta]\ntarget = \"a.txt\"\n").unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid {
                origin: ScriptOrigin::Inline,
                script: None,
                ..
            }
        ));
        assert!(err.to_string().starts_with("invalid patch script <inline>:"));
    }
}
