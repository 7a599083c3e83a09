//! Patch scripts compiled into the binary.

use crate::config::{parse_script, ConfigError, PatchScript, ScriptOrigin};

#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub source: &'static str,
}

impl Preset {
    pub fn load(&self) -> Result<PatchScript, ConfigError> {
        parse_script(self.source, ScriptOrigin::Builtin(self.name))
    }
}

const PRESETS: &[Preset] = &[
    Preset {
        name: "fix-image-upload",
        source: include_str!("../patches/fix-image-upload.toml"),
    },
    Preset {
        name: "update-button",
        source: include_str!("../patches/update-button.toml"),
    },
];

pub fn all() -> &'static [Preset] {
    PRESETS
}

pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}
