//! Bridge configuration parameters
//!
//! All tunable parameters for one bridge instance. Values come from the
//! defaults, an optional JSON file, and a couple of environment overrides.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::Verbosity;
use crate::wire::codec::MAX_FRAME_SIZE;

/// Environment variable selecting the message logging verbosity (0, 1 or 2).
pub const DEBUG_LEVEL_VAR: &str = "BRIDGEWORK_DEBUG_LEVEL";

/// Environment variable overriding the socket endpoint directory.
pub const ENDPOINT_DIR_VAR: &str = "BRIDGEWORK_ENDPOINT_DIR";

/// Core bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Directory holding the Unix domain socket endpoints. A unique one is
    /// generated when unset.
    pub endpoint_base_dir: Option<PathBuf>,
    /// How much of the message traffic gets logged
    pub verbosity: Verbosity,
    /// Initial capacity of serialization buffers (bytes)
    pub buffer_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint_base_dir: None,
            verbosity: Verbosity::Basic,
            buffer_capacity: 256,
        }
    }
}

impl BridgeConfig {
    /// Load a configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config `{}`", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config `{}`", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply [`DEBUG_LEVEL_VAR`] and [`ENDPOINT_DIR_VAR`] overrides using
    /// `lookup` (normally `|k| std::env::var(k).ok()`). Unparseable debug
    /// levels are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = lookup(DEBUG_LEVEL_VAR) {
            match level.trim().parse::<u8>().ok().and_then(Verbosity::from_level) {
                Some(verbosity) => self.verbosity = verbosity,
                None => log::warn!("ignoring invalid {DEBUG_LEVEL_VAR}={level:?}"),
            }
        }
        if let Some(dir) = lookup(ENDPOINT_DIR_VAR).filter(|d| !d.is_empty()) {
            self.endpoint_base_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) against the
    /// process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Reject values that would make the bridge unusable.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(Error::Config("buffer_capacity must be non-zero"));
        }
        if self.buffer_capacity > MAX_FRAME_SIZE {
            return Err(Error::Config("buffer_capacity exceeds the maximum frame size"));
        }
        Ok(())
    }
}
