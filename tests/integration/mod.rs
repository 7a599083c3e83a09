//! Integration tests for the built-in patch scripts.
//!
//! Each test copies a fixture into a temp workspace at the script's target
//! path, runs the script, and compares against the golden output.

mod fix_image_upload;
mod update_button;

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
}

/// Create a workspace holding `content` at `relative`.
pub fn setup_workspace(relative: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join(relative);
    fs::create_dir_all(target.parent().unwrap()).unwrap();
    fs::write(&target, content).unwrap();
    (dir, target)
}
