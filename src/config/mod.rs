pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, parse_script, ConfigError, ScriptOrigin};
pub use schema::{
    Metadata, PatchScript, RuleDefinition, RuleKind, ValidationError, ValidationIssue,
};
