use std::{path::Path, str::FromStr};

use anyhow::Context;
use capsicum::EnforcementMode;
use logger::LevelFilter;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_FDS: u64 = 1024;

// SandboxConfig is read once at startup. Every field may be omitted from the
// JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub enforcement: EnforcementMode,
    pub max_fds: u64,
    pub log_level: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enforcement: EnforcementMode::default(),
            max_fds: DEFAULT_MAX_FDS,
            log_level: "info".to_string(),
        }
    }
}

impl SandboxConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open config {:?}", path))?;
        let config = serde_json::from_reader(&file)
            .with_context(|| format!("Failed to load SandboxConfig from {:?}", path))?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer_pretty(&file, self)?;
        Ok(())
    }

    pub fn log_level(&self) -> anyhow::Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .with_context(|| format!("invalid log level {:?}", self.log_level))
    }
}
