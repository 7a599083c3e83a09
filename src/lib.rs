//! Patch Runner: deterministic text patching for a single target file
//!
//! A patch script names one target file and an ordered list of substitution
//! rules. Each rule is either a literal substring or a regular expression
//! (compiled with dot-matches-all so multi-line blocks match as a unit), and
//! every occurrence is replaced. Rules run in order, each seeing the text the
//! previous rules produced.
//!
//! # Safety
//!
//! - Every rule reports its match count; rules that match nothing are
//!   surfaced instead of silently succeeding
//! - Optional exact-count expectations abort the run before anything is written
//! - Atomic file writes (tempfile + fsync + rename)
//! - The target is re-fingerprinted right before writing to catch concurrent edits
//!
//! # Example
//!
//! ```no_run
//! use patch_runner::{PatchRunner, Rule, RunOptions};
//!
//! let rules = vec![
//!     Rule::literal("state", "useState<File | null>(null)", "useState('')").unwrap(),
//! ];
//! let report = PatchRunner::new("src/App.tsx", rules)
//!     .run(RunOptions::default())
//!     .unwrap();
//! println!("{} rule(s) applied", report.applied().count());
//! ```

pub mod config;
pub mod presets;
pub mod rule;
pub mod runner;
pub mod write;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, PatchScript, ScriptOrigin};
pub use rule::{DriftHint, Expect, Rule, RuleError, Substitution};
pub use runner::{
    LineEnding, PatchRunner, RuleOutcome, RuleStatus, RunError, RunOptions, RunReport,
};
pub use write::WriteError;
